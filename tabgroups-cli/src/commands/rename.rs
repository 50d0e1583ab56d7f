//! Rename group command.

use std::path::Path;

use tabgroups_core::GroupPatch;

use crate::error::CliError;
use crate::util::{find_group_index, load_document, save_document};

/// Rename group command handler
pub fn cmd_rename(data_path: &Path, id_or_title: &str, title: &str) -> Result<(), CliError> {
    if title.trim().is_empty() {
        return Err(CliError::Config("Group title cannot be empty".to_string()));
    }

    let mut document = load_document(data_path)?;
    let index = find_group_index(&document.data.groups, id_or_title)?;

    let group = &mut document.data.groups[index];
    let old = group.title.clone();
    let patch = GroupPatch {
        title: Some(title.to_string()),
        ..GroupPatch::default()
    };
    if !patch.apply(group) {
        println!("Group '{old}' already has this title");
        return Ok(());
    }

    println!("Renamed group '{old}' to '{}'", group.title);
    save_document(data_path, &document)
}
