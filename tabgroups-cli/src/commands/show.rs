//! Show group details command.

use std::path::Path;

use tabgroups_core::Group;

use crate::error::CliError;
use crate::format::yes_no;
use crate::util::{find_group, load_document};

/// Show group command handler
pub fn cmd_show(data_path: &Path, id_or_title: &str) -> Result<(), CliError> {
    let document = load_document(data_path)?;
    let group = find_group(&document.data.groups, id_or_title)?;
    let hotkeys = document
        .data
        .hotkeys
        .iter()
        .filter(|h| h.group_id == Some(group.id))
        .count();

    print_group(group, hotkeys);
    Ok(())
}

fn print_group(group: &Group, hotkeys: usize) {
    println!("Group Details:");
    println!("  ID:     {}", group.id);
    println!("  Title:  {}", group.title);
    println!("  Color:  {}", group.icon_color);
    if let Some(ref icon) = group.icon_url {
        println!("  Icon:   {icon}");
    }
    println!("  Sticky: {}", yes_no(group.is_sticky));

    if let Some(ref container) = group.new_tab_container {
        println!("\nNew tab container: {container}");
        println!(
            "  Re-open tabs from other containers: {}",
            yes_no(group.if_not_default_container_re_open_in_new)
        );
    }

    println!("\nCatch Rules:");
    if group.catch_tab_rules.is_empty() {
        println!("  (none)");
    }
    for rule in &group.catch_tab_rules {
        println!("  {rule}");
    }
    if !group.catch_tab_containers.is_empty() {
        println!("  Containers: {}", group.catch_tab_containers.join(", "));
    }

    println!("\nBehaviour:");
    println!(
        "  Mute when hidden:        {}",
        yes_no(group.mute_tabs_when_group_close_and_restore_when_open)
    );
    println!(
        "  Keep tabs loaded:        {}",
        yes_no(group.dont_discard_tabs_after_hide_this_group)
    );
    println!(
        "  Show after moving a tab: {}",
        yes_no(group.show_tab_after_moving_it_into_this_group)
    );

    if hotkeys > 0 {
        println!("\nHotkeys: {hotkeys}");
    }
}
