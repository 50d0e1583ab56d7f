//! Delete group command.

use std::path::Path;

use crate::error::CliError;
use crate::util::{find_group_index, load_document, save_document};

/// Delete group command handler
///
/// Hotkeys bound to the group are removed with it.
pub fn cmd_delete(data_path: &Path, id_or_title: &str) -> Result<(), CliError> {
    let mut document = load_document(data_path)?;

    let index = find_group_index(&document.data.groups, id_or_title)?;
    let group = document.data.groups.remove(index);
    document
        .data
        .hotkeys
        .retain(|h| h.group_id != Some(group.id));

    save_document(data_path, &document)?;
    println!("Deleted group '{}' (ID: {})", group.title, group.id);
    Ok(())
}
