//! JSON lists stored under a single key.

use curalink_core::{KeyValueStore, StorageError};
use serde::Serialize;
use serde::de::DeserializeOwned;

pub(crate) async fn load_list<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Vec<T>, StorageError> {
    match store.get(key).await? {
        None => Ok(Vec::new()),
        Some(raw) => serde_json::from_str(&raw).map_err(|e| StorageError::Corrupted {
            key: key.to_string(),
            reason: e.to_string(),
        }),
    }
}

pub(crate) async fn save_list<T: Serialize>(
    store: &dyn KeyValueStore,
    key: &str,
    items: &[T],
) -> Result<(), StorageError> {
    let raw = serde_json::to_string(items).map_err(|e| StorageError::Encode {
        key: key.to_string(),
        reason: e.to_string(),
    })?;
    store.set(key, raw).await
}
