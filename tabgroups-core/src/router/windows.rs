//! Window event handlers

use crate::error::Result;
use crate::host::TabQuery;
use crate::models::{GroupId, Tab, Window, WindowId};
use crate::tabs::NewTab;
use crate::windows;

use super::EventRouter;

impl EventRouter {
    pub(super) async fn on_window_created(&self, window: Window) -> Result<()> {
        if !window.is_allowed() {
            self.state.ignore_window(window.id);
            tracing::debug!(window_id = %window.id, kind = ?window.kind, "Ignoring window");
            return Ok(());
        }

        let window = self.state.cache.load_window_session(window).await;

        // A restored window remembers a group that is loaded elsewhere or
        // no longer shown here
        if window.session.group_id.is_some() {
            self.state.cache.remove_window_group(window.id);
            self.toolbar.reset(window.id).await?;
            for tab in self
                .state
                .ports
                .tabs
                .query(TabQuery::in_window(window.id))
                .await?
            {
                self.state.cache.remove_tab_group(tab.id);
            }
            return Ok(());
        }

        if self.state.options().create_new_group_when_open_new_window {
            self.manager.add(Some(window.id), &[], None, false).await?;
        }
        Ok(())
    }

    pub(super) async fn on_window_focus_changed(&self, window_id: Option<WindowId>) -> Result<()> {
        let Some(window_id) = window_id else {
            return Ok(());
        };
        if self.state.is_window_ignored(window_id) {
            return Ok(());
        }

        let changed = Self::lock(&self.last_focused).replace(window_id) != Some(window_id);
        if changed {
            self.toolbar.rebuild_menus(Some(window_id)).await?;
        }
        Ok(())
    }

    pub(super) async fn on_window_removed(&self, window_id: WindowId) -> Result<()> {
        tracing::debug!(window_id = %window_id, "Window removed");
        self.state.unignore_window(window_id);
        self.state.cache.remove_window(window_id);

        let closing = std::mem::take(&mut *Self::lock(&self.closing_tabs));
        let to_create = self.state.cache.take_removed_tabs_for_create(&closing);
        if to_create.is_empty() {
            return Ok(());
        }

        let target = match windows::last_focused_normal(&self.state).await {
            Ok(window) => window.id,
            Err(e) => {
                tracing::info!(error = %e, count = to_create.len(), "No window left for closed group tabs");
                return Ok(());
            }
        };

        let groups = self.store.load_all().await?;
        let tabs: Vec<NewTab> = to_create
            .iter()
            .filter_map(|tab| {
                let group = groups.iter().find(|g| Some(g.id) == tab.group_id())?;
                Some(recreate(tab, group.id, target))
            })
            .collect();

        tracing::info!(window_id = %window_id, count = tabs.len(), "Recreating grouped tabs of closed window");
        let created = self.tabs.create_tabs_safe(tabs, true, true).await?;
        self.updates
            .schedule_all(created.iter().filter_map(Tab::group_id));
        Ok(())
    }
}

fn recreate(tab: &Tab, group_id: GroupId, window_id: WindowId) -> NewTab {
    NewTab {
        url: Some(tab.url.clone()),
        title: Some(tab.title.clone()),
        window_id: Some(window_id),
        discarded: true,
        cookie_store_id: Some(tab.cookie_store_id.clone()),
        group_id: Some(group_id),
        fav_icon_url: tab.session.fav_icon_url.clone(),
        thumbnail: tab.session.thumbnail.clone(),
        ..NewTab::default()
    }
}
