//! Typed view of the storage document

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::Options;
use crate::error::{StorageError, StorageResult};
use crate::models::{Group, GroupId, Hotkey, PinnedTab};

use super::StorageAdapter;

/// Data format version written by this build
pub const CURRENT_VERSION: &str = "4.7.2";

/// The persisted document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredData {
    /// Data format version
    #[serde(default = "current_version")]
    pub version: String,
    /// Groups without runtime tabs, display order
    #[serde(default)]
    pub groups: Vec<Group>,
    /// Highest group id ever assigned
    #[serde(default)]
    pub last_created_group_position: u32,
    /// Keyboard shortcuts
    #[serde(default)]
    pub hotkeys: Vec<Hotkey>,
    /// Pinned tabs, only present in backups
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pinned_tabs: Option<Vec<PinnedTab>>,
    /// Set while a backup restore is running
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_backup_restoring: bool,
    /// User options, flattened into the top level
    #[serde(flatten)]
    pub options: Options,
}

fn current_version() -> String {
    CURRENT_VERSION.to_string()
}

impl Default for StoredData {
    fn default() -> Self {
        Self {
            version: current_version(),
            groups: Vec::new(),
            last_created_group_position: 0,
            hotkeys: Vec::new(),
            pinned_tabs: None,
            is_backup_restoring: false,
            options: Options::default(),
        }
    }
}

impl StoredData {
    /// Parses a raw document
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidDocument`] if a known key has the
    /// wrong shape.
    pub fn from_map(map: Map<String, Value>) -> StorageResult<Self> {
        serde_json::from_value(Value::Object(map))
            .map_err(|e| StorageError::InvalidDocument(e.to_string()))
    }

    /// Serializes into a raw document, groups stored without tabs
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidDocument`] if serialization fails.
    pub fn to_map(&self) -> StorageResult<Map<String, Value>> {
        let stored = Self {
            groups: self.groups.iter().map(Group::without_tabs).collect(),
            ..self.clone()
        };
        match serde_json::to_value(stored) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(StorageError::InvalidDocument("not an object".to_string())),
            Err(e) => Err(StorageError::InvalidDocument(e.to_string())),
        }
    }

    /// Loads the document from storage
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be read or the document is invalid.
    pub async fn load(storage: &dyn StorageAdapter) -> StorageResult<Self> {
        Self::from_map(storage.get_all().await?)
    }

    /// Writes the whole document to storage
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be written.
    pub async fn save(&self, storage: &dyn StorageAdapter) -> StorageResult<()> {
        storage.set(self.to_map()?).await
    }

    /// Looks up a group
    #[must_use]
    pub fn group(&self, id: GroupId) -> Option<&Group> {
        self.groups.iter().find(|g| g.id == id)
    }

    /// Allocates the next group id
    pub fn next_group_id(&mut self) -> GroupId {
        let max_existing = self.groups.iter().map(|g| g.id.0).max().unwrap_or(0);
        self.last_created_group_position = self.last_created_group_position.max(max_existing) + 1;
        GroupId(self.last_created_group_position)
    }
}
