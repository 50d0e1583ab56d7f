//! JSON file backed storage

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::Mutex;

use crate::error::{StorageError, StorageResult};

use super::StorageAdapter;

/// Stores the document as a single pretty-printed JSON file
///
/// Writes go to a sibling temporary file that is renamed over the target,
/// so a crash never leaves a half-written document.
#[derive(Debug)]
pub struct JsonFileStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStorage {
    /// Creates a store for `path`; the file is created on first write
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Default document location in the user's data directory
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_dir().map(|dir| dir.join("tabgroups").join("storage.json"))
    }

    /// Document location
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> StorageResult<Map<String, Value>> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(StorageError::Read(format!("{}: {e}", self.path.display()))),
        };

        if text.trim().is_empty() {
            return Ok(Map::new());
        }

        match serde_json::from_str(&text) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(StorageError::InvalidDocument(
                "top level value is not an object".to_string(),
            )),
            Err(e) => Err(StorageError::InvalidDocument(e.to_string())),
        }
    }

    async fn write(&self, data: &Map<String, Value>) -> StorageResult<()> {
        let text = serde_json::to_string_pretty(data)
            .map_err(|e| StorageError::Write(e.to_string()))?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, text).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for JsonFileStorage {
    async fn get_all(&self) -> StorageResult<Map<String, Value>> {
        let _guard = self.lock.lock().await;
        self.read().await
    }

    async fn set(&self, values: Map<String, Value>) -> StorageResult<()> {
        let _guard = self.lock.lock().await;
        let mut data = self.read().await?;
        data.extend(values);
        self.write(&data).await
    }

    async fn remove(&self, keys: &[&str]) -> StorageResult<()> {
        let _guard = self.lock.lock().await;
        let mut data = self.read().await?;
        for key in keys {
            data.remove(*key);
        }
        self.write(&data).await
    }

    async fn clear(&self) -> StorageResult<()> {
        let _guard = self.lock.lock().await;
        self.write(&Map::new()).await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonFileStorage::new(dir.path().join("data.json"));
        assert!(storage.get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn set_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join("data.json");

        let storage = JsonFileStorage::new(&path);
        let mut values = Map::new();
        values.insert("version".into(), json!("1.0.0"));
        storage.set(values).await.unwrap();

        let reopened = JsonFileStorage::new(&path);
        let data = reopened.get_all().await.unwrap();
        assert_eq!(data["version"], json!("1.0.0"));
    }

    #[tokio::test]
    async fn non_object_document_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        std::fs::write(&path, "[1, 2]").unwrap();

        let err = JsonFileStorage::new(&path).get_all().await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidDocument(_)));
    }
}
