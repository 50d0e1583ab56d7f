//! Group manager for add, remove, update and move operations
//!
//! Every operation persists through [`GroupStore`] first and then brings the
//! host in line: tabs are moved or closed, the toolbar and menus refreshed
//! and listeners informed.

use std::sync::Arc;

use crate::apply::GroupApplier;
use crate::error::{Result, TabGroupsError};
use crate::host::TabQuery;
use crate::messages::{BgMessage, GroupUpdate};
use crate::models::{Group, GroupId, GroupPatch, Tab, TabId, WindowId};
use crate::state::SessionState;
use crate::tabs::{NewTab, TabOps};
use crate::toolbar::Toolbar;

use super::{GroupStore, GroupUpdates};

/// Orchestrates group lifecycle operations
pub struct GroupManager {
    state: Arc<SessionState>,
    tabs: Arc<TabOps>,
    store: Arc<GroupStore>,
    toolbar: Arc<Toolbar>,
    updates: Arc<GroupUpdates>,
    applier: Arc<GroupApplier>,
}

impl GroupManager {
    /// Creates the manager
    #[must_use]
    pub fn new(
        state: Arc<SessionState>,
        tabs: Arc<TabOps>,
        store: Arc<GroupStore>,
        toolbar: Arc<Toolbar>,
        updates: Arc<GroupUpdates>,
        applier: Arc<GroupApplier>,
    ) -> Self {
        Self {
            state,
            tabs,
            store,
            toolbar,
            updates,
            applier,
        }
    }

    /// Creates a group
    ///
    /// With `window_id` the group is loaded in that window and adopts its
    /// visible ungrouped tabs. `tab_ids` are moved into the group
    /// afterwards, and the group is shown when `show_after_move` is set.
    ///
    /// # Errors
    ///
    /// Returns a storage or host error.
    pub async fn add(
        &self,
        window_id: Option<WindowId>,
        tab_ids: &[TabId],
        title: Option<String>,
        show_after_move: bool,
    ) -> Result<Group> {
        let group = self.store.allocate(title).await?;
        tracing::info!(group_id = %group.id, title = %group.title, "Group created");

        if let Some(window_id) = window_id {
            self.state.cache.set_window_group(window_id, group.id);
            let visible = self
                .tabs
                .query(TabQuery::in_window(window_id).pinned(false).hidden(false))
                .await?;
            for tab in visible.iter().filter(|t| t.group_id().is_none()) {
                self.state.cache.set_tab_group(tab.id, Some(group.id));
            }
            self.toolbar.show_group(window_id, Some(&group)).await?;
        }

        if !tab_ids.is_empty() {
            self.move_tabs(tab_ids, group.id, show_after_move).await?;
        }

        self.toolbar.rebuild_menus(None).await?;

        let message = BgMessage::GroupAdded {
            group: group.summary(),
        };
        self.state.send_external(&message);
        self.state.send(message);
        self.updates.schedule(group.id);
        Ok(group)
    }

    /// Deletes a group and closes its tabs
    ///
    /// The group and a snapshot of its tabs go to the trash so the removal
    /// can be undone for the rest of the session. Hotkeys bound to the
    /// group are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`TabGroupsError::GroupNotFound`], a storage or host error.
    pub async fn remove(&self, group_id: GroupId) -> Result<()> {
        let group = self.store.load_one_with_tabs(group_id).await?;

        self.store
            .update(|data| {
                data.groups.retain(|g| g.id != group_id);
                data.hotkeys.retain(|h| h.group_id != Some(group_id));
                Ok(())
            })
            .await?;
        self.state.trash.push(group.clone());

        let group_window = self.state.cache.get_window_id(group_id);
        if let Some(window_id) = group_window {
            self.toolbar.set_loading(Some(window_id)).await;
            self.state.cache.remove_window_group(window_id);
        }

        if !group.tabs.is_empty() {
            if let Some(window_id) = group_window {
                self.tabs.create_temp_active_tab(window_id, false).await?;
            }
            let ids: Vec<TabId> = group.tabs.iter().map(|t| t.id).collect();
            self.tabs.remove(&ids).await?;
        }

        self.toolbar.rebuild_menus(None).await?;
        if let Some(window_id) = group_window {
            self.toolbar.reset(window_id).await?;
        }

        let message = BgMessage::GroupRemoved { group_id };
        self.state.send_external(&message);
        self.state.send(message);
        tracing::info!(group_id = %group_id, tabs = group.tabs.len(), "Group removed");

        if self.state.options().show_notification_after_group_delete {
            self.state
                .notify(format!(
                    "Group \"{}\" was deleted. It can be restored from the tab context menu.",
                    group.title
                ))
                .await;
        }
        Ok(())
    }

    /// Brings back a group removed during this session
    ///
    /// Its tabs are reopened hidden and unloaded.
    ///
    /// # Errors
    ///
    /// Returns [`TabGroupsError::GroupNotFound`] if the group is not in
    /// the trash, or a storage or host error.
    pub async fn restore_removed(&self, group_id: GroupId) -> Result<Group> {
        let group = self
            .state
            .trash
            .take(group_id)
            .ok_or(TabGroupsError::GroupNotFound(group_id))?;

        let stored = group.without_tabs();
        self.store
            .update(move |data| {
                data.groups.retain(|g| g.id != stored.id);
                data.last_created_group_position =
                    data.last_created_group_position.max(stored.id.0);
                data.groups.push(stored);
                Ok(())
            })
            .await?;

        let tabs: Vec<NewTab> = group.tabs.iter().map(|tab| reopen(&group, tab)).collect();
        self.tabs.create_tabs_safe(tabs, true, true).await?;

        self.toolbar.rebuild_menus(None).await?;
        let message = BgMessage::GroupAdded {
            group: group.summary(),
        };
        self.state.send_external(&message);
        self.state.send(message);
        self.updates.schedule(group_id);
        tracing::info!(group_id = %group_id, "Removed group restored");
        Ok(group.without_tabs())
    }

    /// Changes group settings
    ///
    /// Listeners are only informed when something actually changed.
    ///
    /// # Errors
    ///
    /// Returns [`TabGroupsError::GroupNotFound`] or a storage error.
    pub async fn update(&self, group_id: GroupId, patch: GroupPatch) -> Result<Group> {
        let (group, changed) = self
            .store
            .update(move |data| {
                let group = data
                    .groups
                    .iter_mut()
                    .find(|g| g.id == group_id)
                    .ok_or(TabGroupsError::GroupNotFound(group_id))?;
                let changed = patch.apply(group);
                Ok((group.clone(), changed))
            })
            .await?;

        if !changed {
            return Ok(group);
        }

        let message = BgMessage::GroupUpdated {
            group: GroupUpdate::settings(&group),
        };
        self.state.send_external(&message);
        self.state.send(message);

        if let Some(window_id) = self.state.cache.get_window_id(group_id) {
            self.toolbar.show_group(window_id, Some(&group)).await?;
        }
        self.toolbar.rebuild_menus(None).await?;
        tracing::debug!(group_id = %group_id, "Group settings updated");
        Ok(group)
    }

    /// Moves tabs into a group
    ///
    /// Source and target groups get a `group-updated` refresh. With
    /// `show_after_move` the target group is loaded with the first moved
    /// tab active.
    ///
    /// # Errors
    ///
    /// Returns [`TabGroupsError::GroupNotFound`], or a host error.
    pub async fn move_tabs(
        &self,
        tab_ids: &[TabId],
        group_id: GroupId,
        show_after_move: bool,
    ) -> Result<Vec<Tab>> {
        self.store.load(group_id).await?;

        let sources: Vec<GroupId> = tab_ids
            .iter()
            .filter_map(|id| self.state.cache.tab_group(*id))
            .filter(|g| *g != group_id)
            .collect();

        let moved = self.tabs.move_to_group(tab_ids, group_id).await?;
        self.updates
            .schedule_all(sources.into_iter().chain(std::iter::once(group_id)));

        if show_after_move && let Some(first) = moved.first() {
            self.applier
                .apply_group(None, group_id, Some(first.id), false)
                .await;
        }
        Ok(moved)
    }
}

impl std::fmt::Debug for GroupManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupManager").finish_non_exhaustive()
    }
}

fn reopen(group: &Group, tab: &Tab) -> NewTab {
    NewTab {
        url: Some(tab.url.clone()),
        title: Some(tab.title.clone()),
        discarded: true,
        cookie_store_id: Some(tab.cookie_store_id.clone()),
        group_id: Some(group.id),
        fav_icon_url: tab.session.fav_icon_url.clone().or_else(|| tab.fav_icon_url.clone()),
        thumbnail: tab.session.thumbnail.clone(),
        ..NewTab::default()
    }
}
