//! # CuraLink Core
//!
//! Domain types, traits, and error definitions for the CuraLink telehealth
//! backend. This crate has **no framework dependencies**: it defines the
//! domain model every other crate implements against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator is a trait here:
//! - [`Provider`]: the generative-AI service behind each flow
//! - [`KeyValueStore`]: the narrow get/set/remove persistence seam
//! - [`Clock`]: wall time and delays, injectable for tests
//!
//! Implementations live in their respective crates.

pub mod chat;
pub mod clock;
pub mod error;
pub mod kv;
pub mod media;
pub mod message;
pub mod provider;
pub mod schema;

// Re-export key types at crate root for ergonomics
pub use chat::{ChatTurn, Sender};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{Error, ProviderError, Result, StorageError, ValidationError};
pub use kv::KeyValueStore;
pub use media::DataUri;
pub use message::{Message, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, ResponseSchema, Usage};
pub use schema::{Field, FieldKind, Schema, TextFormat};
