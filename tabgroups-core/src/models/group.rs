//! Group model

use serde::{Deserialize, Deserializer, Serialize};

use super::{GroupId, Tab};

/// A named, ordered collection of tabs treated as a unit
///
/// Groups are persisted in the data document without their tabs. The
/// [`tabs`](Self::tabs) field is filled at runtime from the host tab list
/// when a group is loaded "with tabs".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    /// Stable identity, never reused
    pub id: GroupId,
    /// Display title
    pub title: String,
    /// Icon color (CSS color)
    #[serde(default)]
    pub icon_color: String,
    /// Custom icon url
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
    /// Exempt from catch rules of other groups
    #[serde(default)]
    pub is_sticky: bool,
    /// Containers whose new tabs are routed into this group
    #[serde(default)]
    pub catch_tab_containers: Vec<String>,
    /// Ordered URL regular expressions routing tabs into this group
    #[serde(default, deserialize_with = "deserialize_rules")]
    pub catch_tab_rules: Vec<String>,
    /// Container new tabs of this group are (re)opened in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_tab_container: Option<String>,
    /// Re-open tabs from non-default containers too
    #[serde(default)]
    pub if_not_default_container_re_open_in_new: bool,
    /// Mute tabs when the group is hidden, unmute when shown
    #[serde(default)]
    pub mute_tabs_when_group_close_and_restore_when_open: bool,
    /// Keep tabs loaded after hiding this group
    #[serde(default)]
    pub dont_discard_tabs_after_hide_this_group: bool,
    /// Load this group after a tab was moved into it
    #[serde(default)]
    pub show_tab_after_moving_it_into_this_group: bool,
    /// Runtime tab list, display order
    #[serde(skip)]
    pub tabs: Vec<Tab>,
}

impl Group {
    /// Creates a group with default settings
    ///
    /// An empty title is replaced with `"Group {id}"`.
    #[must_use]
    pub fn new(id: GroupId, title: Option<String>) -> Self {
        let title = title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| format!("Group {id}"));

        Self {
            id,
            title,
            icon_color: "#5c5c5c".to_string(),
            icon_url: None,
            is_sticky: false,
            catch_tab_containers: Vec::new(),
            catch_tab_rules: Vec::new(),
            new_tab_container: None,
            if_not_default_container_re_open_in_new: false,
            mute_tabs_when_group_close_and_restore_when_open: false,
            dont_discard_tabs_after_hide_this_group: false,
            show_tab_after_moving_it_into_this_group: false,
            tabs: Vec::new(),
        }
    }

    /// Returns a copy without runtime tabs, as stored in the document
    #[must_use]
    pub fn without_tabs(&self) -> Self {
        Self {
            tabs: Vec::new(),
            ..self.clone()
        }
    }

    /// Short description for external extensions and menus
    #[must_use]
    pub fn summary(&self) -> GroupSummary {
        GroupSummary {
            id: self.id,
            title: self.title.clone(),
            icon_color: self.icon_color.clone(),
            icon_url: self.icon_url.clone(),
        }
    }
}

/// Group as exposed to partner extensions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupSummary {
    /// Group id
    pub id: GroupId,
    /// Title
    pub title: String,
    /// Icon color
    pub icon_color: String,
    /// Icon url
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
}

/// Partial update of a group's settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupPatch {
    /// New title
    pub title: Option<String>,
    /// New icon color
    pub icon_color: Option<String>,
    /// New icon url (`Some(None)` clears it)
    pub icon_url: Option<Option<String>>,
    /// Sticky flag
    pub is_sticky: Option<bool>,
    /// Catch containers
    pub catch_tab_containers: Option<Vec<String>>,
    /// Catch rules
    pub catch_tab_rules: Option<Vec<String>>,
    /// New tab container (`Some(None)` clears it)
    pub new_tab_container: Option<Option<String>>,
    /// Re-open from non-default containers
    pub if_not_default_container_re_open_in_new: Option<bool>,
    /// Mute on hide
    pub mute_tabs_when_group_close_and_restore_when_open: Option<bool>,
    /// Skip discarding on hide
    pub dont_discard_tabs_after_hide_this_group: Option<bool>,
    /// Show group after moving a tab into it
    pub show_tab_after_moving_it_into_this_group: Option<bool>,
}

impl GroupPatch {
    /// Applies the patch, returning `true` if anything changed
    pub fn apply(self, group: &mut Group) -> bool {
        let before = group.without_tabs();

        if let Some(title) = self.title {
            group.title = title;
        }
        if let Some(color) = self.icon_color {
            group.icon_color = color;
        }
        if let Some(url) = self.icon_url {
            group.icon_url = url;
        }
        if let Some(sticky) = self.is_sticky {
            group.is_sticky = sticky;
        }
        if let Some(containers) = self.catch_tab_containers {
            group.catch_tab_containers = containers;
        }
        if let Some(rules) = self.catch_tab_rules {
            group.catch_tab_rules = normalize_rules(rules);
        }
        if let Some(container) = self.new_tab_container {
            group.new_tab_container = container;
        }
        if let Some(flag) = self.if_not_default_container_re_open_in_new {
            group.if_not_default_container_re_open_in_new = flag;
        }
        if let Some(flag) = self.mute_tabs_when_group_close_and_restore_when_open {
            group.mute_tabs_when_group_close_and_restore_when_open = flag;
        }
        if let Some(flag) = self.dont_discard_tabs_after_hide_this_group {
            group.dont_discard_tabs_after_hide_this_group = flag;
        }
        if let Some(flag) = self.show_tab_after_moving_it_into_this_group {
            group.show_tab_after_moving_it_into_this_group = flag;
        }

        before != group.without_tabs()
    }
}

/// Splits a newline separated rule block into trimmed, non-empty rules
#[must_use]
pub fn split_rules(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

fn normalize_rules(rules: Vec<String>) -> Vec<String> {
    rules
        .into_iter()
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .collect()
}

// Older documents store rules as one newline separated string
fn deserialize_rules<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawRules {
        Text(String),
        List(Vec<String>),
    }

    Ok(match Option::<RawRules>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(RawRules::Text(text)) => split_rules(&text),
        Some(RawRules::List(list)) => normalize_rules(list),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_group_gets_default_title() {
        let group = Group::new(GroupId(3), None);
        assert_eq!(group.title, "Group 3");

        let group = Group::new(GroupId(3), Some("   ".to_string()));
        assert_eq!(group.title, "Group 3");

        let group = Group::new(GroupId(3), Some("Work".to_string()));
        assert_eq!(group.title, "Work");
    }

    #[test]
    fn rules_accept_newline_separated_text() {
        let json = r#"{"id": 1, "title": "A", "catchTabRules": " ^https://a \n\n  b.example  \n"}"#;
        let group: Group = serde_json::from_str(json).unwrap();
        assert_eq!(group.catch_tab_rules, vec!["^https://a", "b.example"]);
    }

    #[test]
    fn rules_accept_list_and_null() {
        let json = r#"{"id": 1, "title": "A", "catchTabRules": ["x", " ", "y"]}"#;
        let group: Group = serde_json::from_str(json).unwrap();
        assert_eq!(group.catch_tab_rules, vec!["x", "y"]);

        let json = r#"{"id": 1, "title": "A", "catchTabRules": null}"#;
        let group: Group = serde_json::from_str(json).unwrap();
        assert!(group.catch_tab_rules.is_empty());
    }

    #[test]
    fn tabs_are_not_serialized() {
        let group = Group::new(GroupId(1), None);
        let value = serde_json::to_value(&group).unwrap();
        assert!(value.get("tabs").is_none());
        assert_eq!(value["id"], 1);
    }

    #[test]
    fn patch_reports_changes() {
        let mut group = Group::new(GroupId(1), None);
        let patch = GroupPatch {
            title: Some("Renamed".to_string()),
            catch_tab_rules: Some(vec![" ^https://docs ".to_string(), String::new()]),
            ..GroupPatch::default()
        };
        assert!(patch.apply(&mut group));
        assert_eq!(group.title, "Renamed");
        assert_eq!(group.catch_tab_rules, vec!["^https://docs"]);

        assert!(!GroupPatch::default().apply(&mut group));
    }
}
