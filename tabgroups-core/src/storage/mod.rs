//! Persistent key-value document
//!
//! The engine stores everything in one flat JSON object. [`StorageAdapter`]
//! is the host-provided key-value store; [`StoredData`] is its typed view.

mod document;
mod file;

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::{Mutex, PoisonError};

use crate::error::StorageResult;

pub use document::{CURRENT_VERSION, StoredData};
pub use file::JsonFileStorage;

/// Flat key-value document store
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    /// Reads the whole document
    async fn get_all(&self) -> StorageResult<Map<String, Value>>;

    /// Reads selected keys; missing keys are absent from the result
    async fn get(&self, keys: &[&str]) -> StorageResult<Map<String, Value>> {
        let mut all = self.get_all().await?;
        Ok(keys
            .iter()
            .filter_map(|key| all.remove(*key).map(|value| ((*key).to_string(), value)))
            .collect())
    }

    /// Writes keys, leaving others untouched
    async fn set(&self, values: Map<String, Value>) -> StorageResult<()>;

    /// Removes keys
    async fn remove(&self, keys: &[&str]) -> StorageResult<()>;

    /// Removes everything
    async fn clear(&self) -> StorageResult<()>;
}

/// In-memory document, used by tests and simulations
#[derive(Debug, Default)]
pub struct MemoryStorage {
    data: Mutex<Map<String, Value>>,
}

impl MemoryStorage {
    /// Creates an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding `data`
    #[must_use]
    pub fn with_data(data: Map<String, Value>) -> Self {
        Self {
            data: Mutex::new(data),
        }
    }

    /// Copy of the current document
    #[must_use]
    pub fn snapshot(&self) -> Map<String, Value> {
        self.data
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl StorageAdapter for MemoryStorage {
    async fn get_all(&self) -> StorageResult<Map<String, Value>> {
        Ok(self.snapshot())
    }

    async fn set(&self, values: Map<String, Value>) -> StorageResult<()> {
        self.data
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(values);
        Ok(())
    }

    async fn remove(&self, keys: &[&str]) -> StorageResult<()> {
        let mut data = self.data.lock().unwrap_or_else(PoisonError::into_inner);
        for key in keys {
            data.remove(*key);
        }
        Ok(())
    }

    async fn clear(&self) -> StorageResult<()> {
        self.data
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn memory_storage_get_set_remove() {
        let storage = MemoryStorage::new();
        let mut values = Map::new();
        values.insert("a".into(), json!(1));
        values.insert("b".into(), json!("two"));
        storage.set(values).await.unwrap();

        let got = storage.get(&["a", "missing"]).await.unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got["a"], json!(1));

        storage.remove(&["a"]).await.unwrap();
        assert!(!storage.snapshot().contains_key("a"));

        storage.clear().await.unwrap();
        assert!(storage.snapshot().is_empty());
    }
}
