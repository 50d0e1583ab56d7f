//! Tab model and session overlay

use serde::{Deserialize, Serialize};

use super::{DEFAULT_COOKIE_STORE_ID, GroupId, TabId, WindowId};

/// Favicon shown for tabs without a usable icon
pub const DEFAULT_FAV_ICON: &str = "/icons/tab.svg";

const EMPTY_URLS: &[&str] = &["about:blank", "about:newtab", "about:home"];

/// Loading status reported by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TabStatus {
    /// Tab is loading
    Loading,
    /// Tab finished loading
    #[default]
    Complete,
}

/// Media sharing state; a sharing tab cannot be hidden
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharingState {
    /// Sharing the camera
    #[serde(default)]
    pub camera: bool,
    /// Sharing the microphone
    #[serde(default)]
    pub microphone: bool,
    /// Sharing the screen or a window
    #[serde(default)]
    pub screen: bool,
}

impl SharingState {
    /// Returns true if anything is being shared
    #[must_use]
    pub const fn is_sharing(&self) -> bool {
        self.camera || self.microphone || self.screen
    }
}

/// Extension-owned overlay attached to a host tab
///
/// Not part of the host tab object. The session cache attaches it on tab
/// creation and persists it separately from host state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabSession {
    /// Group the tab belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<GroupId>,
    /// Normalized favicon url
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fav_icon_url: Option<String>,
    /// Thumbnail data url
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

/// Host tab with its session overlay
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tab {
    /// Host id
    pub id: TabId,
    /// Window containing the tab
    pub window_id: WindowId,
    /// Position in the window's tab strip
    #[serde(default)]
    pub index: u32,
    /// Current url
    #[serde(default)]
    pub url: String,
    /// Page title
    #[serde(default)]
    pub title: String,
    /// Loading status
    #[serde(default)]
    pub status: TabStatus,
    /// Active in its window
    #[serde(default)]
    pub active: bool,
    /// Pinned tabs are never grouped
    #[serde(default)]
    pub pinned: bool,
    /// Hidden by the extension
    #[serde(default)]
    pub hidden: bool,
    /// Unloaded from memory
    #[serde(default)]
    pub discarded: bool,
    /// Audio muted
    #[serde(default)]
    pub muted: bool,
    /// Container the tab runs in
    #[serde(default = "default_cookie_store_id")]
    pub cookie_store_id: String,
    /// Host favicon url
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fav_icon_url: Option<String>,
    /// Last access timestamp (milliseconds)
    #[serde(default)]
    pub last_accessed: u64,
    /// Media sharing state
    #[serde(default)]
    pub sharing_state: SharingState,
    /// Extension session overlay
    #[serde(default)]
    pub session: TabSession,
}

fn default_cookie_store_id() -> String {
    DEFAULT_COOKIE_STORE_ID.to_string()
}

impl Tab {
    /// Creates a visible, loaded tab in the default container
    #[must_use]
    pub fn new(id: TabId, window_id: WindowId, url: impl Into<String>) -> Self {
        Self {
            id,
            window_id,
            index: 0,
            url: url.into(),
            title: String::new(),
            status: TabStatus::Complete,
            active: false,
            pinned: false,
            hidden: false,
            discarded: false,
            muted: false,
            cookie_store_id: default_cookie_store_id(),
            fav_icon_url: None,
            last_accessed: 0,
            sharing_state: SharingState::default(),
            session: TabSession::default(),
        }
    }

    /// Group id from the session overlay
    #[must_use]
    pub const fn group_id(&self) -> Option<GroupId> {
        self.session.group_id
    }

    /// A tab can be hidden unless it is pinned or sharing media
    #[must_use]
    pub const fn can_be_hidden(&self) -> bool {
        !self.pinned && !self.sharing_state.is_sharing()
    }

    /// Finished loading
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.status == TabStatus::Complete
    }

    /// Still loading
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.status == TabStatus::Loading
    }
}

/// Partial tab update delivered with the host's tab-updated event
///
/// Also used as the payload of `tab-updated` broadcasts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeInfo {
    /// Loading status
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TabStatus>,
    /// Title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Url
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Favicon
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fav_icon_url: Option<String>,
    /// Pinned
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pinned: Option<bool>,
    /// Hidden
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,
    /// Discarded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discarded: Option<bool>,
    /// Muted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub muted: Option<bool>,
    /// Active
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

impl ChangeInfo {
    /// Returns true if the status transitioned to complete
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.status == Some(TabStatus::Complete)
    }
}

/// Pinned tab entry stored in backups
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PinnedTab {
    /// Url
    pub url: String,
    /// Title
    #[serde(default)]
    pub title: String,
    /// Container, omitted for the default one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookie_store_id: Option<String>,
}

/// Returns a favicon url suitable for display
///
/// Host-internal icon urls cannot be loaded from extension pages and are
/// replaced with the default icon.
#[must_use]
pub fn normalize_fav_icon(fav_icon_url: Option<&str>) -> String {
    match fav_icon_url {
        Some(url) if !url.is_empty() && !url.starts_with("chrome://") => url.to_string(),
        _ => DEFAULT_FAV_ICON.to_string(),
    }
}

/// Blank pages that carry no content worth restoring
#[must_use]
pub fn is_url_empty(url: &str) -> bool {
    EMPTY_URLS.contains(&url)
}

/// Returns true if the host allows extensions to open this url
///
/// Empty pages are rejected when `reject_empty` is set.
#[must_use]
pub fn is_url_allowed_to_create(url: &str, reject_empty: bool) -> bool {
    let allowed = ["http://", "https://", "ftp://", "moz-extension://"]
        .iter()
        .any(|scheme| url.starts_with(scheme))
        || is_url_empty(url);

    allowed && !(reject_empty && is_url_empty(url))
}
