//! User options persisted in the storage document

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Result, TabGroupsError};

/// Unit of the auto backup interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupIntervalKey {
    /// Every N hours
    Hours,
    /// Every N days
    #[default]
    Days,
}

/// User option flags, stored flattened at the top level of the document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Options {
    /// Unload tabs after their group is hidden
    pub discard_tabs_after_hide: bool,
    /// Prefix window titles with the loaded group title
    pub prepend_group_title_to_window_title: bool,
    /// New windows get a new group
    pub create_new_group_when_open_new_window: bool,
    /// Notify with an undo hint after a group is deleted
    pub show_notification_after_group_delete: bool,
    /// Open the manage page in a tab rather than a popup window
    pub open_manage_groups_in_tab: bool,
    /// Show the move-tab menu on tabs
    pub show_context_menu_on_tabs: bool,
    /// Show the open-in-group menu on links
    pub show_context_menu_on_links: bool,
    /// Periodic backups
    pub auto_backup_enable: bool,
    /// Interval unit
    pub auto_backup_interval_key: BackupIntervalKey,
    /// Interval value, 1 to 20
    pub auto_backup_interval_value: u32,
    /// Include thumbnails in backups
    pub auto_backup_include_tab_thumbnails: bool,
    /// Include favicons in backups
    pub auto_backup_include_tab_fav_icons: bool,
    /// Unix seconds of the last auto backup
    pub auto_backup_last_backup_time_stamp: i64,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            discard_tabs_after_hide: false,
            prepend_group_title_to_window_title: false,
            create_new_group_when_open_new_window: false,
            show_notification_after_group_delete: true,
            open_manage_groups_in_tab: true,
            show_context_menu_on_tabs: true,
            show_context_menu_on_links: true,
            auto_backup_enable: true,
            auto_backup_interval_key: BackupIntervalKey::Days,
            auto_backup_interval_value: 1,
            auto_backup_include_tab_thumbnails: true,
            auto_backup_include_tab_fav_icons: true,
            auto_backup_last_backup_time_stamp: 0,
        }
    }
}

/// Keys accepted by [`Options::merge`]; `hotkeys` is stored next to them
pub const OPTION_KEYS: &[&str] = &[
    "discardTabsAfterHide",
    "prependGroupTitleToWindowTitle",
    "createNewGroupWhenOpenNewWindow",
    "showNotificationAfterGroupDelete",
    "openManageGroupsInTab",
    "showContextMenuOnTabs",
    "showContextMenuOnLinks",
    "autoBackupEnable",
    "autoBackupIntervalKey",
    "autoBackupIntervalValue",
    "autoBackupIncludeTabThumbnails",
    "autoBackupIncludeTabFavIcons",
    "autoBackupLastBackupTimeStamp",
    "hotkeys",
];

impl Options {
    /// Merges a patch of camelCase keys into a copy of the options
    ///
    /// Every key must be known and every value must have the right type;
    /// nothing is applied otherwise. `hotkeys` is accepted but ignored here.
    ///
    /// # Errors
    ///
    /// Returns [`TabGroupsError::Config`] for unknown keys or bad values.
    pub fn merge(&self, patch: &Map<String, Value>) -> Result<Self> {
        let unknown: Vec<&str> = patch
            .keys()
            .map(String::as_str)
            .filter(|key| !OPTION_KEYS.contains(key))
            .collect();
        if !unknown.is_empty() {
            return Err(TabGroupsError::Config(format!(
                "unsupported option keys: {}",
                unknown.join(", ")
            )));
        }

        let mut current = match serde_json::to_value(self)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        for (key, value) in patch {
            if key != "hotkeys" {
                current.insert(key.clone(), value.clone());
            }
        }

        let merged: Self = serde_json::from_value(Value::Object(current))
            .map_err(|e| TabGroupsError::Config(format!("invalid option value: {e}")))?;
        if !(1..=20).contains(&merged.auto_backup_interval_value) {
            return Err(TabGroupsError::Config(format!(
                "autoBackupIntervalValue out of range: {}",
                merged.auto_backup_interval_value
            )));
        }
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn patch(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn merge_applies_known_keys() {
        let options = Options::default();
        let merged = options
            .merge(&patch(json!({
                "discardTabsAfterHide": true,
                "autoBackupIntervalKey": "hours",
            })))
            .unwrap();

        assert!(merged.discard_tabs_after_hide);
        assert_eq!(merged.auto_backup_interval_key, BackupIntervalKey::Hours);
        assert!(merged.show_context_menu_on_tabs);
    }

    #[test]
    fn merge_rejects_unknown_keys() {
        let err = Options::default()
            .merge(&patch(json!({"discardTabsAfterHide": true, "colour": "red"})))
            .unwrap_err();
        assert!(err.to_string().contains("colour"));
    }

    #[test]
    fn merge_rejects_bad_values() {
        assert!(
            Options::default()
                .merge(&patch(json!({"discardTabsAfterHide": "yes"})))
                .is_err()
        );
        assert!(
            Options::default()
                .merge(&patch(json!({"autoBackupIntervalValue": 21})))
                .is_err()
        );
    }

    #[test]
    fn stored_keys_are_camel_case() {
        let value = serde_json::to_value(Options::default()).unwrap();
        for key in value.as_object().unwrap().keys() {
            assert!(OPTION_KEYS.contains(&key.as_str()), "{key}");
        }
    }
}
