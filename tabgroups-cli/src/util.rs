//! Shared utility functions used across command modules.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tabgroups_core::{Group, GroupId, JsonFileStorage, StorageAdapter, StoredData, migrate};
use tokio::runtime::Runtime;

use crate::error::CliError;

/// Data document read from disk, upgraded in memory
#[derive(Debug)]
pub struct Document {
    /// Parsed document
    pub data: StoredData,
    /// Keys the upgrade dropped
    pub removed_keys: Vec<String>,
    /// Version found on disk
    pub from_version: String,
}

/// Picks the document path from the argument or the user's data directory
pub fn resolve_data_path(data: Option<&Path>) -> Result<PathBuf, CliError> {
    match data {
        Some(path) => Ok(path.to_path_buf()),
        None => JsonFileStorage::default_path().ok_or_else(|| {
            CliError::Config("No data directory found, pass --data <PATH>".to_string())
        }),
    }
}

/// Creates the async runtime storage calls run on
pub fn runtime() -> Result<Runtime, CliError> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::Config(format!("Failed to create async runtime: {e}")))
}

/// Reads the document at `path`, upgrading older formats in memory
///
/// A missing file reads as an empty document.
pub fn load_document(path: &Path) -> Result<Document, CliError> {
    let storage = JsonFileStorage::new(path);
    let raw = runtime()?.block_on(storage.get_all())?;

    let migrated = migrate(Value::Object(raw))?;
    tracing::debug!(
        path = %path.display(),
        from = %migrated.from_version,
        removed = migrated.removed_keys.len(),
        "Document loaded"
    );

    Ok(Document {
        data: StoredData::from_map(migrated.data)?,
        removed_keys: migrated.removed_keys,
        from_version: migrated.from_version,
    })
}

/// Writes the document, dropping keys its upgrade removed
pub fn save_document(path: &Path, document: &Document) -> Result<(), CliError> {
    let storage = JsonFileStorage::new(path);
    let map = document.data.to_map()?;
    let keys: Vec<&str> = document.removed_keys.iter().map(String::as_str).collect();

    runtime()?.block_on(async {
        storage.set(map).await?;
        if !keys.is_empty() {
            storage.remove(&keys).await?;
        }
        Ok::<_, CliError>(())
    })?;

    tracing::info!(path = %path.display(), groups = document.data.groups.len(), "Document saved");
    Ok(())
}

/// Find a group by id or title
pub fn find_group<'a>(groups: &'a [Group], id_or_title: &str) -> Result<&'a Group, CliError> {
    // Numeric arguments name an id first
    if let Ok(id) = id_or_title.trim().parse::<u32>()
        && let Some(group) = groups.iter().find(|g| g.id == GroupId(id))
    {
        return Ok(group);
    }

    if let Some(group) = groups.iter().find(|g| g.title == id_or_title) {
        return Ok(group);
    }

    if let Some(group) = groups
        .iter()
        .find(|g| g.title.eq_ignore_ascii_case(id_or_title))
    {
        return Ok(group);
    }

    let prefix = id_or_title.to_lowercase();
    let matches: Vec<&Group> = groups
        .iter()
        .filter(|g| g.title.to_lowercase().starts_with(&prefix))
        .collect();

    match matches.as_slice() {
        [] => Err(CliError::GroupNotFound(id_or_title.to_string())),
        [group] => Ok(group),
        _ => Err(CliError::AmbiguousGroup {
            name: id_or_title.to_string(),
            matches: matches
                .iter()
                .map(|g| g.title.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        }),
    }
}

/// Index of a group by id or title, for commands that modify it
pub fn find_group_index(groups: &[Group], id_or_title: &str) -> Result<usize, CliError> {
    let id = find_group(groups, id_or_title)?.id;
    groups
        .iter()
        .position(|g| g.id == id)
        .ok_or_else(|| CliError::GroupNotFound(id_or_title.to_string()))
}
