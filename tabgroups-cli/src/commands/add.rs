//! Add group command.

use std::path::Path;

use tabgroups_core::Group;

use crate::error::CliError;
use crate::util::{load_document, save_document};

/// Add group command handler
pub fn cmd_add(
    data_path: &Path,
    title: Option<String>,
    color: Option<String>,
    sticky: bool,
) -> Result<(), CliError> {
    let mut document = load_document(data_path)?;

    let id = document.data.next_group_id();
    let mut group = Group::new(id, title);
    if let Some(color) = color {
        if color.trim().is_empty() {
            return Err(CliError::Config("Icon color cannot be empty".to_string()));
        }
        group.icon_color = color;
    }
    group.is_sticky = sticky;

    println!("Created group '{}' with ID {}", group.title, group.id);
    document.data.groups.push(group);
    save_document(data_path, &document)
}
