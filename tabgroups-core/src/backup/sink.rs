//! Backup destinations

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{Result, StorageError};

use super::BackupData;

const FILE_PREFIX: &str = "tabgroups-backup";
const AUTO_DIR: &str = "auto-backups";

/// Where backups are written
#[async_trait]
pub trait BackupSink: Send + Sync {
    /// Writes a backup and returns where it went
    ///
    /// With `overwrite` an automatic backup replaces the previous automatic
    /// backup of the same day.
    async fn write(&self, backup: &BackupData, is_auto: bool, overwrite: bool) -> Result<String>;
}

/// Writes backups as JSON files into a directory
///
/// Manual backups go to the directory itself, automatic ones to an
/// `auto-backups` subdirectory.
#[derive(Debug, Clone)]
pub struct JsonFileBackupSink {
    dir: PathBuf,
}

impl JsonFileBackupSink {
    /// Creates a sink for `dir`; the directory is created on first write
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Target directory
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File a backup taken at `at` is written to
    #[must_use]
    pub fn file_path(&self, at: DateTime<Utc>, is_auto: bool, overwrite: bool) -> PathBuf {
        let dir = if is_auto {
            self.dir.join(AUTO_DIR)
        } else {
            self.dir.clone()
        };
        let name = if is_auto && overwrite {
            format!("{FILE_PREFIX}-{}.json", at.format("%Y-%m-%d"))
        } else {
            format!("{FILE_PREFIX}-{}.json", at.format("%Y-%m-%d@%H-%M-%S"))
        };
        dir.join(name)
    }
}

#[async_trait]
impl BackupSink for JsonFileBackupSink {
    async fn write(&self, backup: &BackupData, is_auto: bool, overwrite: bool) -> Result<String> {
        let at = backup.created_at.unwrap_or_else(Utc::now);
        let path = self.file_path(at, is_auto, overwrite);
        let text = backup.to_json()?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(StorageError::from)?;
        }
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, text)
            .await
            .map_err(StorageError::from)?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(StorageError::from)?;

        tracing::info!(path = %path.display(), is_auto, "Backup written");
        Ok(path.display().to_string())
    }
}
