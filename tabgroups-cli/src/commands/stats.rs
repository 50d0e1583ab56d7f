//! Document statistics command.

use std::path::Path;

use chrono::{DateTime, Utc};

use crate::error::CliError;
use crate::format::yes_no;
use crate::util::load_document;

/// Show document statistics
pub fn cmd_stats(data_path: &Path) -> Result<(), CliError> {
    let document = load_document(data_path)?;
    let data = &document.data;

    let sticky = data.groups.iter().filter(|g| g.is_sticky).count();
    let with_rules = data
        .groups
        .iter()
        .filter(|g| !g.catch_tab_rules.is_empty() || !g.catch_tab_containers.is_empty())
        .count();
    let rules: usize = data.groups.iter().map(|g| g.catch_tab_rules.len()).sum();
    let bound_hotkeys = data.hotkeys.iter().filter(|h| h.group_id.is_some()).count();

    println!("TabGroups Statistics");
    println!("====================\n");

    println!("Document:   {}", data_path.display());
    println!("Version:    {}", document.from_version);
    println!("Last ID:    {}", data.last_created_group_position);

    println!("\nGroups:     {}", data.groups.len());
    println!("  Sticky:     {sticky}");
    println!("  With rules: {with_rules}");
    println!("Catch rules: {rules}");
    println!("Hotkeys:    {} ({bound_hotkeys} bound to a group)", data.hotkeys.len());

    let options = &data.options;
    println!("\nAuto backup: {}", yes_no(options.auto_backup_enable));
    if options.auto_backup_enable {
        println!(
            "  Every {} {:?}",
            options.auto_backup_interval_value, options.auto_backup_interval_key
        );
        let last = DateTime::<Utc>::from_timestamp(options.auto_backup_last_backup_time_stamp, 0)
            .filter(|_| options.auto_backup_last_backup_time_stamp > 0)
            .map_or_else(|| "never".to_string(), |t| t.to_rfc3339());
        println!("  Last backup: {last}");
    }

    Ok(())
}
