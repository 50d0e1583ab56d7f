//! Document upgrade command.

use std::path::Path;

use tabgroups_core::CURRENT_VERSION;

use crate::error::CliError;
use crate::util::{load_document, save_document};

/// Migrate command handler
pub fn cmd_migrate(data_path: &Path, dry_run: bool) -> Result<(), CliError> {
    let document = load_document(data_path)?;

    if document.from_version == CURRENT_VERSION {
        println!("Document is already at version {CURRENT_VERSION}");
        return Ok(());
    }

    println!(
        "Upgrading {} from {} to {CURRENT_VERSION}",
        data_path.display(),
        document.from_version
    );
    if !document.removed_keys.is_empty() {
        println!("  Removed keys: {}", document.removed_keys.join(", "));
    }

    if dry_run {
        println!("Dry run, nothing written");
        return Ok(());
    }

    save_document(data_path, &document)?;
    println!("Done");
    Ok(())
}
