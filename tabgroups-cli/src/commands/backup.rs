//! Backup and restore commands.
//!
//! Offline backups carry groups, hotkeys and options; tabs only exist in a
//! running browser. Restored groups are merged with fresh ids and start
//! empty until the extension reopens their tabs.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::Utc;
use tabgroups_core::{
    BackupData, BackupGroup, BackupSink, CURRENT_VERSION, JsonFileBackupSink, StoredData,
    merge_backup,
};

use crate::error::CliError;
use crate::util::{load_document, runtime, save_document};

/// Backup command handler
pub fn cmd_backup(data_path: &Path, output: Option<&Path>) -> Result<(), CliError> {
    let document = load_document(data_path)?;
    let backup = offline_backup(document.data);

    let written = match output {
        Some(path) => {
            std::fs::write(path, backup.to_json()?)?;
            path.display().to_string()
        }
        None => {
            let sink = JsonFileBackupSink::new(".");
            runtime()?.block_on(sink.write(&backup, false, false))?
        }
    };

    println!("Backup written to {written}");
    println!("  {}", backup.summary());
    Ok(())
}

/// Restore command handler
pub fn cmd_restore(data_path: &Path, file: &Path) -> Result<(), CliError> {
    let text = std::fs::read_to_string(file)?;
    let backup = BackupData::from_json(&text)?;
    let skipped_tabs = backup.tab_count();

    let mut document = load_document(data_path)?;
    let merged = merge_backup(std::mem::take(&mut document.data), backup);
    document.data = merged.data;

    let ids: Vec<String> = merged
        .groups
        .iter()
        .map(|entry| entry.group.id.to_string())
        .collect();

    save_document(data_path, &document)?;

    println!("Restored {} groups from {}", ids.len(), file.display());
    if !ids.is_empty() {
        println!("  New IDs: {}", ids.join(", "));
    }
    if skipped_tabs > 0 {
        println!("  {skipped_tabs} tabs are reopened when the backup is restored in the browser");
    }
    Ok(())
}

/// Backup of a stored document, without tabs
#[must_use]
pub fn offline_backup(data: StoredData) -> BackupData {
    BackupData {
        version: CURRENT_VERSION.to_string(),
        created_at: Some(Utc::now()),
        groups: data
            .groups
            .into_iter()
            .map(|group| BackupGroup {
                group,
                tabs: Vec::new(),
            })
            .collect(),
        last_created_group_position: data.last_created_group_position,
        hotkeys: data.hotkeys,
        pinned_tabs: None,
        containers: BTreeMap::new(),
        options: data.options,
    }
}
