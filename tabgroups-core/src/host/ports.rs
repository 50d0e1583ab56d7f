//! Host command boundary
//!
//! Every browser capability the engine uses is reached through one of these
//! traits. Implementations return host objects without session overlays;
//! the session cache hydrates them.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::HostResult;
use crate::models::{Container, ContainerDetails, GroupId, Tab, TabId, TabSession, Window, WindowId};

/// Filter for [`TabPort::query`]; `None` fields match anything
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TabQuery {
    /// Restrict to a window
    pub window_id: Option<WindowId>,
    /// Pinned state
    pub pinned: Option<bool>,
    /// Hidden state
    pub hidden: Option<bool>,
    /// Active state
    pub active: Option<bool>,
    /// Discarded state
    pub discarded: Option<bool>,
    /// Container
    pub cookie_store_id: Option<String>,
}

impl TabQuery {
    /// All tabs in all windows
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// All tabs in one window
    #[must_use]
    pub fn in_window(window_id: WindowId) -> Self {
        Self {
            window_id: Some(window_id),
            ..Self::default()
        }
    }

    /// Restricts by pinned state
    #[must_use]
    pub const fn pinned(mut self, pinned: bool) -> Self {
        self.pinned = Some(pinned);
        self
    }

    /// Restricts by hidden state
    #[must_use]
    pub const fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = Some(hidden);
        self
    }

    /// Restricts by active state
    #[must_use]
    pub const fn active(mut self, active: bool) -> Self {
        self.active = Some(active);
        self
    }

    /// Returns true if `tab` satisfies the filter
    #[must_use]
    pub fn matches(&self, tab: &Tab) -> bool {
        self.window_id.is_none_or(|w| tab.window_id == w)
            && self.pinned.is_none_or(|p| tab.pinned == p)
            && self.hidden.is_none_or(|h| tab.hidden == h)
            && self.active.is_none_or(|a| tab.active == a)
            && self.discarded.is_none_or(|d| tab.discarded == d)
            && self
                .cookie_store_id
                .as_ref()
                .is_none_or(|c| &tab.cookie_store_id == c)
    }
}

/// Properties for [`TabPort::create`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateTabProps {
    /// Url, the host's new tab page when absent
    pub url: Option<String>,
    /// Title for lazily loaded (discarded) tabs
    pub title: Option<String>,
    /// Target window, the last focused one when absent
    pub window_id: Option<WindowId>,
    /// Position, appended when absent
    pub index: Option<u32>,
    /// Activate after creation
    pub active: bool,
    /// Create pinned
    pub pinned: bool,
    /// Create unloaded
    pub discarded: bool,
    /// Container
    pub cookie_store_id: Option<String>,
}

/// Properties for [`TabPort::update`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TabUpdate {
    /// Activate the tab
    pub active: Option<bool>,
    /// Mute or unmute
    pub muted: Option<bool>,
    /// Navigate to url
    pub url: Option<String>,
    /// Pin or unpin
    pub pinned: Option<bool>,
}

/// Host tab commands
#[async_trait]
pub trait TabPort: Send + Sync {
    /// Lists tabs matching the filter, ordered by window then index
    async fn query(&self, query: TabQuery) -> HostResult<Vec<Tab>>;

    /// Gets one tab
    async fn get(&self, id: TabId) -> HostResult<Tab>;

    /// Creates a tab
    async fn create(&self, props: CreateTabProps) -> HostResult<Tab>;

    /// Moves tabs into a window at `index` (`None` appends), keeping their ids
    async fn move_tabs(
        &self,
        ids: &[TabId],
        window_id: WindowId,
        index: Option<u32>,
    ) -> HostResult<Vec<Tab>>;

    /// Shows hidden tabs, returning the ids that are now visible
    async fn show(&self, ids: &[TabId]) -> HostResult<Vec<TabId>>;

    /// Hides tabs, returning the ids that are now hidden
    async fn hide(&self, ids: &[TabId]) -> HostResult<Vec<TabId>>;

    /// Updates tab properties
    async fn update(&self, id: TabId, update: TabUpdate) -> HostResult<Tab>;

    /// Unloads tabs from memory
    async fn discard(&self, ids: &[TabId]) -> HostResult<()>;

    /// Reloads a tab
    async fn reload(&self, id: TabId, bypass_cache: bool) -> HostResult<()>;

    /// Closes tabs
    async fn remove(&self, ids: &[TabId]) -> HostResult<()>;
}

/// Properties for [`WindowPort::create`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateWindowProps {
    /// Url of the initial tab
    pub url: Option<String>,
    /// Focus the new window
    pub focused: bool,
}

/// Host window commands
#[async_trait]
pub trait WindowPort: Send + Sync {
    /// Lists all windows
    async fn get_all(&self) -> HostResult<Vec<Window>>;

    /// Gets one window
    async fn get(&self, id: WindowId) -> HostResult<Window>;

    /// Gets the last focused window of any kind
    async fn get_last_focused(&self) -> HostResult<Window>;

    /// Creates a window with one tab
    async fn create(&self, props: CreateWindowProps) -> HostResult<Window>;

    /// Focuses a window
    async fn focus(&self, id: WindowId) -> HostResult<()>;

    /// Sets the text prepended to the window title
    async fn set_title_preface(&self, id: WindowId, preface: Option<String>) -> HostResult<()>;
}

/// Host per-tab and per-window session value store
///
/// Values survive browser restarts together with the tabs and windows they
/// belong to.
#[async_trait]
pub trait SessionValuesPort: Send + Sync {
    /// Reads a tab's stored session
    async fn get_tab_session(&self, tab_id: TabId) -> HostResult<Option<TabSession>>;

    /// Stores a tab's session
    async fn set_tab_session(&self, tab_id: TabId, session: TabSession) -> HostResult<()>;

    /// Removes a tab's session
    async fn remove_tab_session(&self, tab_id: TabId) -> HostResult<()>;

    /// Reads the group stored on a window
    async fn get_window_group(&self, window_id: WindowId) -> HostResult<Option<GroupId>>;

    /// Stores the group loaded in a window
    async fn set_window_group(&self, window_id: WindowId, group_id: GroupId) -> HostResult<()>;

    /// Removes the group stored on a window
    async fn remove_window_group(&self, window_id: WindowId) -> HostResult<()>;
}

/// Host identity containers
#[async_trait]
pub trait ContainerPort: Send + Sync {
    /// Lists all containers
    async fn query(&self) -> HostResult<Vec<Container>>;

    /// Creates a container
    async fn create(&self, details: ContainerDetails) -> HostResult<Container>;

    /// Removes a container
    async fn remove(&self, cookie_store_id: &str) -> HostResult<()>;
}

/// User visible notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Title line
    pub title: String,
    /// Message body
    pub message: String,
}

impl Notification {
    /// Creates a notification with the default title
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            title: "TabGroups".to_string(),
            message: message.into(),
        }
    }
}

/// Host notifications
#[async_trait]
pub trait NotificationPort: Send + Sync {
    /// Shows a notification
    async fn notify(&self, notification: Notification) -> HostResult<()>;
}

/// Context menu entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuItem {
    /// Entry id
    pub id: String,
    /// Parent entry id
    pub parent_id: Option<String>,
    /// Label
    pub title: String,
    /// Icon url or color
    pub icon: Option<String>,
    /// Clickable
    pub enabled: bool,
}

/// Toolbar button and context menu surface
#[async_trait]
pub trait ToolbarPort: Send + Sync {
    /// Sets the toolbar button title for a window (`None` for the default)
    async fn set_title(&self, window_id: Option<WindowId>, title: &str) -> HostResult<()>;

    /// Sets the toolbar button icon for a window (`None` for the default)
    async fn set_icon(&self, window_id: Option<WindowId>, icon: &str) -> HostResult<()>;

    /// Enables or disables the toolbar button
    async fn set_enabled(&self, enabled: bool) -> HostResult<()>;

    /// Removes every context menu entry
    async fn remove_all_menus(&self) -> HostResult<()>;

    /// Adds a context menu entry
    async fn create_menu(&self, item: MenuItem) -> HostResult<()>;
}
