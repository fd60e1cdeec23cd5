//! # curalink-store
//!
//! Persistence for CuraLink behind the narrow
//! [`KeyValueStore`](curalink_core::KeyValueStore) seam.
//!
//! Backends:
//! - [`InMemoryStore`]: HashMap, for tests and throwaway sessions
//! - [`FileStore`]: a single JSON file, default `~/.curalink/store.json`
//!
//! Services built on top: [`AccountService`], [`PrescriptionService`],
//! [`TestimonialService`].

pub mod accounts;
pub mod error;
pub mod file_backend;
pub mod in_memory;
pub mod password;
pub mod prescriptions;
mod records;
pub mod testimonials;

use std::sync::Arc;

use curalink_config::StorageConfig;
use curalink_core::{KeyValueStore, StorageError};
use tracing::info;

pub use accounts::{AccountRole, AccountService, CurrentUser, LoginRequest, SignupRequest, StoredUser};
pub use error::AccountError;
pub use file_backend::FileStore;
pub use in_memory::InMemoryStore;
pub use prescriptions::{PrescriptionDraft, PrescriptionService, StoredPrescription};
pub use testimonials::{Testimonial, TestimonialDraft, TestimonialService};

/// Open the backend named in the storage config.
pub fn open_store(config: &StorageConfig) -> Result<Arc<dyn KeyValueStore>, StorageError> {
    match config.backend.as_str() {
        "memory" => {
            info!("Using in-memory store");
            Ok(Arc::new(InMemoryStore::new()))
        }
        "file" => {
            let path = config.file_path();
            info!(path = %path.display(), "Using file store");
            Ok(Arc::new(FileStore::open(path)?))
        }
        other => Err(StorageError::Unavailable(format!(
            "Unknown storage backend '{other}' (expected 'memory' or 'file')"
        ))),
    }
}
