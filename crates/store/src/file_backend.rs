//! File-backed store: one JSON object mapping keys to values.
//!
//! The whole map is loaded on open and rewritten on every mutation, so
//! reads never touch the disk. Storage location defaults to
//! `~/.curalink/store.json` (see `StorageConfig::file_path`).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use curalink_core::{KeyValueStore, StorageError};
use tokio::sync::RwLock;
use tracing::debug;

pub struct FileStore {
    path: PathBuf,
    values: Arc<RwLock<BTreeMap<String, String>>>,
}

impl FileStore {
    /// Open the store at `path`. A missing file starts empty; it is created
    /// on the first write.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let values = Self::load_from_disk(&path)?;
        debug!(path = %path.display(), keys = values.len(), "File store loaded");
        Ok(Self {
            path,
            values: Arc::new(RwLock::new(values)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_from_disk(path: &Path) -> Result<BTreeMap<String, String>, StorageError> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => {
                return Err(StorageError::Unavailable(format!(
                    "Failed to read {}: {e}",
                    path.display()
                )));
            }
        };
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&content).map_err(|e| StorageError::Corrupted {
            key: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    async fn flush(&self, values: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                StorageError::Unavailable(format!("Failed to create store directory: {e}"))
            })?;
        }

        let content = serde_json::to_string_pretty(values).map_err(|e| StorageError::Encode {
            key: self.path.display().to_string(),
            reason: e.to_string(),
        })?;

        tokio::fs::write(&self.path, content)
            .await
            .map_err(|e| StorageError::Unavailable(format!("Failed to write store file: {e}")))
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    fn name(&self) -> &str {
        "file"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        let mut values = self.values.write().await;
        values.insert(key.to_string(), value);
        self.flush(&values).await
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut values = self.values.write().await;
        if values.remove(key).is_some() {
            self.flush(&values).await?;
        }
        Ok(())
    }
}
