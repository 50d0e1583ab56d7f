//! Catch rule commands.

use std::path::Path;

use tabgroups_core::{Tab, TabId, WindowId, check_rule, find_catching_group};

use crate::cli::RulesCommands;
use crate::error::CliError;
use crate::util::{find_group, find_group_index, load_document, save_document};

/// Rules command handler
pub fn cmd_rules(data_path: &Path, subcmd: RulesCommands) -> Result<(), CliError> {
    match subcmd {
        RulesCommands::Add { group, pattern } => cmd_rules_add(data_path, &group, &pattern),
        RulesCommands::Remove { group, pattern } => cmd_rules_remove(data_path, &group, &pattern),
        RulesCommands::Test { url } => cmd_rules_test(data_path, &url),
    }
}

fn cmd_rules_add(data_path: &Path, id_or_title: &str, pattern: &str) -> Result<(), CliError> {
    check_rule(pattern).map_err(|e| CliError::Rule(format!("'{pattern}': {e}")))?;
    let pattern = pattern.trim().to_string();

    let mut document = load_document(data_path)?;
    let index = find_group_index(&document.data.groups, id_or_title)?;
    let group = &mut document.data.groups[index];

    if group.catch_tab_rules.contains(&pattern) {
        println!("Group '{}' already has rule '{pattern}'", group.title);
        return Ok(());
    }
    group.catch_tab_rules.push(pattern.clone());
    println!("Added rule '{pattern}' to group '{}'", group.title);

    save_document(data_path, &document)
}

fn cmd_rules_remove(data_path: &Path, id_or_title: &str, pattern: &str) -> Result<(), CliError> {
    let mut document = load_document(data_path)?;
    let index = find_group_index(&document.data.groups, id_or_title)?;
    let group = &mut document.data.groups[index];

    let before = group.catch_tab_rules.len();
    group.catch_tab_rules.retain(|r| r != pattern.trim());
    if group.catch_tab_rules.len() == before {
        return Err(CliError::Rule(format!(
            "Group '{}' has no rule '{pattern}'",
            group.title
        )));
    }
    println!("Removed rule '{pattern}' from group '{}'", group.title);

    save_document(data_path, &document)
}

fn cmd_rules_test(data_path: &Path, url: &str) -> Result<(), CliError> {
    let document = load_document(data_path)?;
    let groups = &document.data.groups;

    let tab = Tab::new(TabId(0), WindowId(0), url);
    match find_catching_group(groups, &tab, false) {
        Some(id) => {
            let group = find_group(groups, &id.to_string())?;
            println!("{url} -> '{}' (ID: {})", group.title, group.id);
        }
        None => println!("No group catches {url}"),
    }
    Ok(())
}
