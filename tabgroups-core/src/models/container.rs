//! Identity containers (cookie stores)

use serde::{Deserialize, Serialize};

/// Cookie store id of the host's default (non-container) identity
pub const DEFAULT_COOKIE_STORE_ID: &str = "firefox-default";

/// Marker stored in [`Group::new_tab_container`](super::Group) meaning
/// "open new tabs in a freshly created temporary container"
pub const TEMPORARY_CONTAINER: &str = "temporary-container";

/// Identity-isolation compartment a tab runs in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    /// Host cookie store id
    pub cookie_store_id: String,
    /// Display name
    pub name: String,
    /// Color name
    #[serde(default)]
    pub color: String,
    /// Icon name
    #[serde(default)]
    pub icon: String,
}

impl Container {
    /// Returns the user-visible details used for backup export and restore
    #[must_use]
    pub fn details(&self) -> ContainerDetails {
        ContainerDetails {
            name: self.name.clone(),
            color: self.color.clone(),
            icon: self.icon.clone(),
        }
    }
}

/// Container description without a host id
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerDetails {
    /// Display name
    pub name: String,
    /// Color name
    #[serde(default)]
    pub color: String,
    /// Icon name
    #[serde(default)]
    pub icon: String,
}
