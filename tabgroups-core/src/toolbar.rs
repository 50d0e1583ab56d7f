//! Toolbar button, window title preface and context menus

use std::sync::Arc;

use crate::error::Result;
use crate::groups::GroupStore;
use crate::host::MenuItem;
use crate::models::{Group, GroupId, WindowId};
use crate::state::SessionState;
use crate::windows;

/// Title shown when no group is loaded
pub const DEFAULT_TITLE: &str = "TabGroups";
/// Icon shown when no group is loaded
pub const DEFAULT_ICON: &str = "/icons/icon.svg";
const LOADING_TITLE: &str = "Loading...";
const LOADING_ICON: &str = "/icons/animate-spinner.svg";
const TITLE_LENGTH: usize = 43;
const PREFACE_LENGTH: usize = 35;

const MOVE_TAB_PARENT: &str = "tabgroups-move-tab-parent";
const OPEN_LINK_PARENT: &str = "tabgroups-open-link-parent";
const MOVE_TAB_PREFIX: &str = "tabgroups-move-tab-";
const OPEN_LINK_PREFIX: &str = "tabgroups-open-link-";
const UNDO_REMOVE_PREFIX: &str = "tabgroups-undo-remove-";
const NEW_GROUP_SUFFIX: &str = "new";
const SET_TAB_ICON: &str = "tabgroups-set-tab-icon";

/// What a clicked context menu entry asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuCommand {
    /// Move the clicked tab into a group
    MoveTab(GroupId),
    /// Move the clicked tab into a new group
    MoveTabToNewGroup,
    /// Open the clicked link in a group
    OpenLink(GroupId),
    /// Open the clicked link in a new group
    OpenLinkInNewGroup,
    /// Use the clicked tab's favicon as the current group's icon
    SetTabIconAsGroupIcon,
    /// Restore a removed group
    UndoRemoveGroup(GroupId),
}

impl MenuCommand {
    /// Parses a menu entry id
    #[must_use]
    pub fn parse(menu_id: &str) -> Option<Self> {
        if menu_id == SET_TAB_ICON {
            return Some(Self::SetTabIconAsGroupIcon);
        }
        if let Some(rest) = menu_id.strip_prefix(MOVE_TAB_PREFIX) {
            return match rest {
                NEW_GROUP_SUFFIX => Some(Self::MoveTabToNewGroup),
                id => id.parse().ok().map(|id| Self::MoveTab(GroupId(id))),
            };
        }
        if let Some(rest) = menu_id.strip_prefix(OPEN_LINK_PREFIX) {
            return match rest {
                NEW_GROUP_SUFFIX => Some(Self::OpenLinkInNewGroup),
                id => id.parse().ok().map(|id| Self::OpenLink(GroupId(id))),
            };
        }
        menu_id
            .strip_prefix(UNDO_REMOVE_PREFIX)
            .and_then(|id| id.parse().ok())
            .map(|id| Self::UndoRemoveGroup(GroupId(id)))
    }

    /// Menu entry id
    #[must_use]
    pub fn menu_id(self) -> String {
        match self {
            Self::MoveTab(id) => format!("{MOVE_TAB_PREFIX}{id}"),
            Self::MoveTabToNewGroup => format!("{MOVE_TAB_PREFIX}{NEW_GROUP_SUFFIX}"),
            Self::OpenLink(id) => format!("{OPEN_LINK_PREFIX}{id}"),
            Self::OpenLinkInNewGroup => format!("{OPEN_LINK_PREFIX}{NEW_GROUP_SUFFIX}"),
            Self::SetTabIconAsGroupIcon => SET_TAB_ICON.to_string(),
            Self::UndoRemoveGroup(id) => format!("{UNDO_REMOVE_PREFIX}{id}"),
        }
    }
}

/// Cuts `text` to `max` characters, marking the cut with an ellipsis
#[must_use]
pub fn slice_text(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut sliced: String = text.chars().take(max.saturating_sub(3)).collect();
    sliced.push_str("...");
    sliced
}

/// Icon of a group: its icon url, or a square in its color
#[must_use]
pub fn group_icon(group: &Group) -> String {
    if let Some(url) = group.icon_url.as_ref().filter(|u| !u.is_empty()) {
        return url.clone();
    }
    let color = if group.icon_color.is_empty() {
        "transparent"
    } else {
        group.icon_color.as_str()
    };
    format!(
        "data:image/svg+xml,<svg xmlns='http://www.w3.org/2000/svg' width='16' height='16'>\
         <rect width='16' height='16' rx='3' fill='{}'/></svg>",
        color.replace('#', "%23")
    )
}

/// Toolbar title for a group
#[must_use]
pub fn group_title(group: &Group) -> String {
    format!("{} - {DEFAULT_TITLE}", slice_text(&group.title, TITLE_LENGTH))
}

/// Keeps the toolbar and menus in line with the loaded groups
pub struct Toolbar {
    state: Arc<SessionState>,
    store: Arc<GroupStore>,
}

impl Toolbar {
    /// Creates the toolbar controller
    #[must_use]
    pub fn new(state: Arc<SessionState>, store: Arc<GroupStore>) -> Self {
        Self { state, store }
    }

    /// Shows the loading indicator
    pub async fn set_loading(&self, window_id: Option<WindowId>) {
        let toolbar = &self.state.ports.toolbar;
        let result = async {
            toolbar.set_title(window_id, LOADING_TITLE).await?;
            toolbar.set_icon(window_id, LOADING_ICON).await
        }
        .await;
        if let Err(e) = result {
            tracing::debug!(error = %e, "Failed to show loading indicator");
        }
    }

    /// Shows the group loaded in `window_id`
    ///
    /// # Errors
    ///
    /// Returns a host error.
    pub async fn update(&self, window_id: WindowId) -> Result<()> {
        let group = match self.state.cache.get_window_group(window_id) {
            Some(group_id) => self.store.load(group_id).await.ok(),
            None => None,
        };
        self.show_group(window_id, group.as_ref()).await
    }

    /// Shows `group` in `window_id`, or the defaults for `None`
    ///
    /// # Errors
    ///
    /// Returns a host error.
    pub async fn show_group(&self, window_id: WindowId, group: Option<&Group>) -> Result<()> {
        let Some(group) = group else {
            return self.reset(window_id).await;
        };

        let toolbar = &self.state.ports.toolbar;
        toolbar.set_title(Some(window_id), &group_title(group)).await?;
        toolbar.set_icon(Some(window_id), &group_icon(group)).await?;
        toolbar.set_enabled(true).await?;
        self.set_title_preface(window_id, Some(&group.title)).await
    }

    /// Shows the defaults in `window_id`
    ///
    /// # Errors
    ///
    /// Returns a host error.
    pub async fn reset(&self, window_id: WindowId) -> Result<()> {
        let toolbar = &self.state.ports.toolbar;
        toolbar.set_title(Some(window_id), DEFAULT_TITLE).await?;
        toolbar.set_icon(Some(window_id), DEFAULT_ICON).await?;
        toolbar.set_enabled(true).await?;
        self.set_title_preface(window_id, None).await
    }

    /// Refreshes every managed window
    ///
    /// # Errors
    ///
    /// Returns a storage or host error.
    pub async fn update_all(&self) -> Result<()> {
        for window in windows::load(&self.state).await? {
            self.update(window.id).await?;
        }
        Ok(())
    }

    async fn set_title_preface(&self, window_id: WindowId, title: Option<&str>) -> Result<()> {
        let preface = title
            .filter(|_| self.state.options().prepend_group_title_to_window_title)
            .map(|title| format!("[{}] ", slice_text(title, PREFACE_LENGTH)));
        self.state
            .ports
            .windows
            .set_title_preface(window_id, preface)
            .await?;
        Ok(())
    }

    /// Rebuilds the context menus for `window_id`, or the last focused
    /// normal window
    ///
    /// # Errors
    ///
    /// Returns a storage or host error.
    pub async fn rebuild_menus(&self, window_id: Option<WindowId>) -> Result<()> {
        let window_id = match window_id {
            Some(id) => Some(id),
            None => windows::last_focused_normal(&self.state)
                .await
                .ok()
                .map(|w| w.id),
        };
        let current = window_id.and_then(|w| self.state.cache.get_window_group(w));
        let groups = self.store.load_all().await?;
        let options = self.state.options();

        let mut items = Vec::new();
        if options.show_context_menu_on_tabs {
            items.push(parent(MOVE_TAB_PARENT, "Move tab to group"));
            items.extend(groups.iter().map(|g| {
                group_item(MenuCommand::MoveTab(g.id), MOVE_TAB_PARENT, g, current)
            }));
            items.push(item(
                MenuCommand::MoveTabToNewGroup,
                MOVE_TAB_PARENT,
                "Create new group",
                true,
            ));
            items.push(item(
                MenuCommand::SetTabIconAsGroupIcon,
                MOVE_TAB_PARENT,
                "Set tab icon as group icon",
                current.is_some(),
            ));
        }
        if options.show_context_menu_on_links {
            items.push(parent(OPEN_LINK_PARENT, "Open link in group"));
            items.extend(groups.iter().map(|g| {
                group_item(MenuCommand::OpenLink(g.id), OPEN_LINK_PARENT, g, current)
            }));
            items.push(item(
                MenuCommand::OpenLinkInNewGroup,
                OPEN_LINK_PARENT,
                "Create new group",
                true,
            ));
        }
        for (group, _) in self.state.trash.list() {
            items.push(MenuItem {
                id: MenuCommand::UndoRemoveGroup(group.id).menu_id(),
                parent_id: None,
                title: format!("Restore group \"{}\"", group.title),
                icon: group.icon_url.clone(),
                enabled: true,
            });
        }

        let toolbar = &self.state.ports.toolbar;
        toolbar.remove_all_menus().await?;
        for menu in items {
            toolbar.create_menu(menu).await?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for Toolbar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Toolbar").finish_non_exhaustive()
    }
}

fn parent(id: &str, title: &str) -> MenuItem {
    MenuItem {
        id: id.to_string(),
        parent_id: None,
        title: title.to_string(),
        icon: None,
        enabled: true,
    }
}

fn item(command: MenuCommand, parent_id: &str, title: &str, enabled: bool) -> MenuItem {
    MenuItem {
        id: command.menu_id(),
        parent_id: Some(parent_id.to_string()),
        title: title.to_string(),
        icon: None,
        enabled,
    }
}

fn group_item(command: MenuCommand, parent_id: &str, group: &Group, current: Option<GroupId>) -> MenuItem {
    let title = if current == Some(group.id) {
        format!("{} (active)", group.title)
    } else {
        group.title.clone()
    };
    MenuItem {
        id: command.menu_id(),
        parent_id: Some(parent_id.to_string()),
        title,
        icon: Some(group_icon(group)),
        enabled: true,
    }
}
