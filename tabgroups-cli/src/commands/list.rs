//! List groups command.

use std::fmt::Write as _;
use std::path::Path;

use serde::Serialize;
use tabgroups_core::Group;

use crate::cli::OutputFormat;
use crate::error::CliError;
use crate::format::{escape_csv_field, yes_no};
use crate::util::load_document;

/// List groups command handler
pub fn cmd_list(data_path: &Path, format: OutputFormat) -> Result<(), CliError> {
    let document = load_document(data_path)?;
    let groups = &document.data.groups;

    match format {
        OutputFormat::Table => println!("{}", format_table(groups)),
        OutputFormat::Json => println!("{}", format_json(groups)?),
        OutputFormat::Csv => println!("{}", format_csv(groups)),
    }

    Ok(())
}

/// Format groups as a table string
#[must_use]
pub fn format_table(groups: &[Group]) -> String {
    if groups.is_empty() {
        return "No groups found.".to_string();
    }

    let mut output = String::new();

    let id_width = groups
        .iter()
        .map(|g| g.id.to_string().len())
        .max()
        .unwrap_or(2)
        .max(2);
    let title_width = groups
        .iter()
        .map(|g| g.title.chars().count())
        .max()
        .unwrap_or(5)
        .max(5);

    let _ = writeln!(
        output,
        "{:<id_width$}  {:<title_width$}  RULES  CONTAINERS  STICKY",
        "ID", "TITLE"
    );
    let _ = writeln!(
        output,
        "{:-<id_width$}  {:-<title_width$}  -----  ----------  ------",
        "", ""
    );

    for group in groups {
        let _ = writeln!(
            output,
            "{:<id_width$}  {:<title_width$}  {:<5}  {:<10}  {}",
            group.id.0,
            group.title,
            group.catch_tab_rules.len(),
            group.catch_tab_containers.len(),
            yes_no(group.is_sticky)
        );
    }

    output.trim_end().to_string()
}

/// Format groups as JSON string
///
/// # Errors
///
/// Returns `CliError::Config` if JSON serialization fails.
pub fn format_json(groups: &[Group]) -> Result<String, CliError> {
    let output: Vec<GroupOutput> = groups.iter().map(GroupOutput::from).collect();
    serde_json::to_string_pretty(&output)
        .map_err(|e| CliError::Config(format!("Failed to serialize to JSON: {e}")))
}

/// Format groups as CSV string
#[must_use]
pub fn format_csv(groups: &[Group]) -> String {
    let mut output = String::new();
    output.push_str("id,title,rules,sticky\n");

    for group in groups {
        let _ = writeln!(
            output,
            "{},{},{},{}",
            group.id,
            escape_csv_field(&group.title),
            escape_csv_field(&group.catch_tab_rules.join(" ")),
            group.is_sticky
        );
    }

    output.trim_end().to_string()
}

/// Simplified group output for CLI
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupOutput {
    pub id: u32,
    pub title: String,
    pub icon_color: String,
    pub is_sticky: bool,
    pub catch_tab_rules: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub catch_tab_containers: Vec<String>,
}

impl From<&Group> for GroupOutput {
    fn from(group: &Group) -> Self {
        Self {
            id: group.id.0,
            title: group.title.clone(),
            icon_color: group.icon_color.clone(),
            is_sticky: group.is_sticky,
            catch_tab_rules: group.catch_tab_rules.clone(),
            catch_tab_containers: group.catch_tab_containers.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use tabgroups_core::GroupId;

    use super::*;

    fn work() -> Group {
        let mut group = Group::new(GroupId(7), Some("Work, mostly".to_string()));
        group.catch_tab_rules = vec![r"jira\.test".to_string(), r"wiki\.test".to_string()];
        group
    }

    #[test]
    fn empty_table() {
        assert_eq!(format_table(&[]), "No groups found.");
    }

    #[test]
    fn table_lists_rule_counts() {
        let table = format_table(&[work()]);
        let row = table.lines().nth(2).unwrap();
        assert!(row.starts_with("7 "));
        assert!(row.contains("Work, mostly"));
        assert!(row.contains(" 2 "));
    }

    #[test]
    fn csv_quotes_titles() {
        let csv = format_csv(&[work()]);
        assert_eq!(
            csv.lines().nth(1),
            Some(r#"7,"Work, mostly",jira\.test wiki\.test,false"#)
        );
    }

    #[test]
    fn json_uses_camel_case() {
        let json = format_json(&[work()]).unwrap();
        assert!(json.contains("\"catchTabRules\""));
        assert!(!json.contains("catchTabContainers"));
    }
}
