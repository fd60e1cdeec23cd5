//! The narrow persistence seam: string values addressed by string keys.
//!
//! Accounts, prescriptions, and testimonials are stored through this trait
//! as JSON text. Backends live in `curalink-store`.

use async_trait::async_trait;

use crate::error::StorageError;

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Backend name for logs (e.g., "memory", "file").
    fn name(&self) -> &str;

    /// Read the value stored under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: String) -> Result<(), StorageError>;

    /// Delete `key`. Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}
