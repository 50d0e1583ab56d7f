//! Catch rules: which group claims a tab
//!
//! A group catches a tab when the tab runs in one of the group's catch
//! containers, or when one of the group's url patterns matches. Groups are
//! tested in list order; the first match wins. Invalid patterns never match.

use regex::Regex;

use crate::models::{Group, GroupId, Tab};

const BLANK_URL: &str = "about:blank";

/// Compiled rules of one group
#[derive(Debug, Clone)]
struct GroupRules {
    group_id: GroupId,
    containers: Vec<String>,
    sources: Vec<String>,
    patterns: Vec<Regex>,
}

impl GroupRules {
    fn matches_text(&self, text: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(text))
    }
}

/// Rules of every group, compiled once
#[derive(Debug, Clone, Default)]
pub struct CatchRules {
    groups: Vec<GroupRules>,
}

impl CatchRules {
    /// Compiles the rules of `groups`, skipping invalid patterns
    #[must_use]
    pub fn compile(groups: &[Group]) -> Self {
        let groups = groups
            .iter()
            .map(|group| GroupRules {
                group_id: group.id,
                containers: group.catch_tab_containers.clone(),
                sources: group.catch_tab_rules.clone(),
                patterns: group
                    .catch_tab_rules
                    .iter()
                    .filter_map(|rule| compile_rule(group.id, rule))
                    .collect(),
            })
            .collect();
        Self { groups }
    }

    /// First group catching the tab
    ///
    /// With `check_title`, a blank tab that finished loading is also tested
    /// by its title.
    #[must_use]
    pub fn find(&self, tab: &Tab, check_title: bool) -> Option<GroupId> {
        let title_applies = check_title && tab.url == BLANK_URL && tab.is_loaded();

        self.groups
            .iter()
            .find(|rules| {
                rules.containers.contains(&tab.cookie_store_id)
                    || rules.matches_text(&tab.url)
                    || (title_applies && rules.matches_text(&tab.title))
            })
            .map(|rules| rules.group_id)
    }

    /// Returns true if these rules were compiled from the rules `groups`
    /// carry now, in the same order
    #[must_use]
    pub fn is_compiled_from(&self, groups: &[Group]) -> bool {
        self.groups.len() == groups.len()
            && self.groups.iter().zip(groups).all(|(rules, group)| {
                rules.group_id == group.id
                    && rules.containers == group.catch_tab_containers
                    && rules.sources == group.catch_tab_rules
            })
    }

    /// Returns true if no group has any rule
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups
            .iter()
            .all(|g| g.containers.is_empty() && g.patterns.is_empty())
    }
}

/// First group in `groups` catching `tab`
#[must_use]
pub fn find_catching_group(groups: &[Group], tab: &Tab, check_title: bool) -> Option<GroupId> {
    CatchRules::compile(groups).find(tab, check_title)
}

/// Checks that a pattern compiles, returning the parser's message if not
///
/// # Errors
///
/// Returns the regex syntax error as text.
pub fn check_rule(rule: &str) -> std::result::Result<(), String> {
    if rule.trim().is_empty() {
        return Err("empty pattern".to_string());
    }
    Regex::new(rule.trim()).map(|_| ()).map_err(|e| e.to_string())
}

fn compile_rule(group_id: GroupId, rule: &str) -> Option<Regex> {
    match Regex::new(rule.trim()) {
        Ok(re) => Some(re),
        Err(e) => {
            tracing::debug!(group_id = %group_id, rule, error = %e, "Invalid catch rule skipped");
            None
        }
    }
}
