//! Generation service providers for CuraLink.
//!
//! All providers implement the `curalink_core::Provider` trait.
//! The router selects the correct provider based on configuration.

pub mod fallback;
pub mod openai_compat;
pub mod router;

pub use fallback::FallbackProvider;
pub use openai_compat::OpenAiCompatProvider;
pub use router::{FALLBACK_CHAIN, ProviderRouter, build_from_config};
