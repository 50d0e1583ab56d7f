//! Engine settings stored as TOML
//!
//! Settings are deployment knobs (timings, capacities, page locations,
//! partner extensions). User preferences live in [`Options`](super::Options)
//! inside the storage document instead.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, TabGroupsError};

/// Debounce and delay intervals in milliseconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingSettings {
    /// Quiet period before caught tabs are moved into their group
    pub lazy_move_ms: u64,
    /// Quiet period before `group-updated` is broadcast
    pub group_updated_ms: u64,
    /// Delay before unused temporary containers are removed
    pub temporary_container_check_ms: u64,
}

impl Default for TimingSettings {
    fn default() -> Self {
        Self {
            lazy_move_ms: 100,
            group_updated_ms: 200,
            temporary_container_check_ms: 100,
        }
    }
}

/// Partner extension allowed to talk to the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalExtension {
    /// Extension id
    pub id: String,
    /// Display title
    pub title: String,
    /// Broadcasts the partner receives
    #[serde(default)]
    pub get_actions: Vec<String>,
    /// Actions the partner may run
    #[serde(default)]
    pub post_actions: Vec<String>,
}

impl ExternalExtension {
    fn new(id: &str, title: &str, get_actions: &[&str], post_actions: &[&str]) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            get_actions: get_actions.iter().map(ToString::to_string).collect(),
            post_actions: post_actions.iter().map(ToString::to_string).collect(),
        }
    }

    /// Returns true if the partner may run `action`
    #[must_use]
    pub fn allows(&self, action: &str) -> bool {
        self.post_actions.iter().any(|a| a == action)
    }
}

/// Engine settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Debounce intervals
    pub timing: TimingSettings,
    /// Entries kept in the group navigation history
    pub history_capacity: usize,
    /// Entries kept in the rolling error log
    pub error_log_capacity: usize,
    /// Url prefix of the extension's own pages
    pub extension_url_prefix: String,
    /// Manage groups page, relative to the prefix
    pub manage_page_path: String,
    /// Page opened when startup fails, relative to the prefix
    pub help_page_path: String,
    /// Partner extensions
    pub external_extensions: Vec<ExternalExtension>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            timing: TimingSettings::default(),
            history_capacity: 50,
            error_log_capacity: 30,
            extension_url_prefix: "moz-extension://tabgroups/".to_string(),
            manage_page_path: "manage/manage.html".to_string(),
            help_page_path: "help/db-error-reinstall.html".to_string(),
            external_extensions: default_external_extensions(),
        }
    }
}

fn default_external_extensions() -> Vec<ExternalExtension> {
    let broadcasts = ["i-am-back", "group-added", "group-updated", "group-removed"];
    vec![
        ExternalExtension::new(
            "stg-plugin-create-new-group@drive4ik",
            "Create new group",
            &["i-am-back"],
            &["add-new-group"],
        ),
        ExternalExtension::new(
            "stg-plugin-load-custom-group@drive4ik",
            "Load custom group",
            &broadcasts,
            &["are-you-here", "get-groups-list", "load-custom-group"],
        ),
        ExternalExtension::new(
            "stg-plugin-group-notes@drive4ik",
            "Group notes",
            &broadcasts,
            &["are-you-here", "get-groups-list"],
        ),
        ExternalExtension::new(
            "stg-plugin-move-tab@drive4ik",
            "Move tab to group",
            &broadcasts,
            &["are-you-here", "get-groups-list", "move-active-tab-to-custom-group"],
        ),
    ]
}

impl Settings {
    /// Default settings file location
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("tabgroups").join("settings.toml"))
    }

    /// Loads settings, falling back to defaults if the file does not exist
    ///
    /// # Errors
    ///
    /// Returns [`TabGroupsError::Config`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "Settings file missing, using defaults");
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(path)
            .map_err(|e| TabGroupsError::Config(format!("{}: {e}", path.display())))?;
        let settings: Self = toml::from_str(&text)
            .map_err(|e| TabGroupsError::Config(format!("{}: {e}", path.display())))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Writes settings as TOML, creating parent directories
    ///
    /// # Errors
    ///
    /// Returns [`TabGroupsError::Config`] on serialization or I/O failure.
    pub fn save(&self, path: &Path) -> Result<()> {
        let text = toml::to_string_pretty(self).map_err(|e| TabGroupsError::Config(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| TabGroupsError::Config(format!("{}: {e}", parent.display())))?;
        }
        std::fs::write(path, text)
            .map_err(|e| TabGroupsError::Config(format!("{}: {e}", path.display())))
    }

    /// Checks value ranges
    ///
    /// # Errors
    ///
    /// Returns [`TabGroupsError::Config`] naming the first invalid value.
    pub fn validate(&self) -> Result<()> {
        if self.error_log_capacity == 0 {
            return Err(TabGroupsError::Config("error_log_capacity must be positive".into()));
        }
        if self.history_capacity == 0 {
            return Err(TabGroupsError::Config("history_capacity must be positive".into()));
        }
        if !self.extension_url_prefix.ends_with('/') {
            return Err(TabGroupsError::Config(
                "extension_url_prefix must end with '/'".into(),
            ));
        }
        Ok(())
    }

    /// Full url of the manage groups page
    #[must_use]
    pub fn manage_page_url(&self) -> String {
        format!("{}{}", self.extension_url_prefix, self.manage_page_path)
    }

    /// Full url of the startup failure help page
    #[must_use]
    pub fn help_page_url(&self) -> String {
        format!("{}{}", self.extension_url_prefix, self.help_page_path)
    }

    /// Returns true for pages of this extension
    #[must_use]
    pub fn is_own_page(&self, url: &str) -> bool {
        url.starts_with(&self.extension_url_prefix)
    }

    /// Returns true for pages of any other extension
    #[must_use]
    pub fn is_foreign_extension_page(&self, url: &str) -> bool {
        url.starts_with("moz-extension://") && !self.is_own_page(url)
    }

    /// Returns true if `url` is the manage groups page
    #[must_use]
    pub fn is_manage_page(&self, url: &str) -> bool {
        url.starts_with(&self.manage_page_url())
    }

    /// Looks up a whitelisted partner extension
    #[must_use]
    pub fn external_extension(&self, id: &str) -> Option<&ExternalExtension> {
        self.external_extensions.iter().find(|ext| ext.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_timings() {
        let settings = Settings::default();
        assert_eq!(settings.timing.lazy_move_ms, 100);
        assert_eq!(settings.timing.group_updated_ms, 200);
        assert_eq!(settings.error_log_capacity, 30);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            history_capacity = 5

            [timing]
            lazy_move_ms = 10
            "#,
        )
        .unwrap();

        assert_eq!(settings.history_capacity, 5);
        assert_eq!(settings.timing.lazy_move_ms, 10);
        assert_eq!(settings.timing.group_updated_ms, 200);
        assert!(!settings.external_extensions.is_empty());
    }

    #[test]
    fn save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.toml");

        let mut settings = Settings::default();
        settings.error_log_capacity = 7;
        settings.save(&path).unwrap();

        let loaded = Settings::load(&path).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = Settings::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(loaded, Settings::default());
    }

    #[test]
    fn page_classification() {
        let settings = Settings::default();
        assert!(settings.is_manage_page("moz-extension://tabgroups/manage/manage.html#x"));
        assert!(settings.is_own_page("moz-extension://tabgroups/popup.html"));
        assert!(settings.is_foreign_extension_page("moz-extension://other/page.html"));
        assert!(!settings.is_foreign_extension_page("https://example.com"));
    }

    #[test]
    fn whitelist_lookup() {
        let settings = Settings::default();
        let ext = settings
            .external_extension("stg-plugin-move-tab@drive4ik")
            .unwrap();
        assert!(ext.allows("move-active-tab-to-custom-group"));
        assert!(!ext.allows("delete-current-group"));
        assert!(settings.external_extension("unknown@test").is_none());
    }
}
