//! Navigation interception
//!
//! Before a top-level navigation commits, the tab is checked against the
//! catch rules of every group and against its own group's container.
//! Caught tabs are moved lazily; a tab in the wrong container is reopened
//! in the right one and the navigation cancelled.

use crate::containers::ContainerRegistry;
use crate::error::Result;
use crate::host::NavigationRequest;
use crate::host::NavigationVerdict;
use crate::models::{TEMPORARY_CONTAINER, Tab};
use crate::tabs::NewTab;

use super::EventRouter;

impl EventRouter {
    pub(super) async fn intercept(&self, request: NavigationRequest) -> Result<NavigationVerdict> {
        if self.state.exclude.contains(request.tab_id) {
            return Ok(NavigationVerdict::Allow);
        }
        if request
            .origin_url
            .as_deref()
            .is_some_and(|origin| self.state.settings.is_foreign_extension_page(origin))
        {
            tracing::debug!(tab_id = %request.tab_id, "Navigation started by another extension");
            return Ok(NavigationVerdict::Allow);
        }

        let mut tab = self.state.ports.tabs.get(request.tab_id).await?;
        if tab.pinned
            || self.state.is_window_ignored(tab.window_id)
            || self.state.containers.is_temporary(&tab.cookie_store_id)
        {
            return Ok(NavigationVerdict::Allow);
        }

        tab.url = request.url;
        if let Some(session) = self.state.cache.get_tab_session(tab.id) {
            tab.session = session;
        }
        let Some(group_id) = tab.group_id() else {
            return Ok(NavigationVerdict::Allow);
        };

        let groups = self.store.load_all().await?;
        let Some(group) = groups.iter().find(|g| g.id == group_id) else {
            return Ok(NavigationVerdict::Allow);
        };

        if !group.is_sticky
            && group.new_tab_container.as_deref() != Some(TEMPORARY_CONTAINER)
            && let Some(destination) = self.store.catch_rules(&groups).find(&tab, false)
            && destination != group.id
        {
            tracing::debug!(tab_id = %tab.id, from = %group.id, to = %destination, "Tab caught by another group");
            self.lazy_moves.push(destination, tab.id);
            return Ok(NavigationVerdict::Allow);
        }

        let Some(container) = group.new_tab_container.as_deref() else {
            return Ok(NavigationVerdict::Allow);
        };
        if container == tab.cookie_store_id
            || (!ContainerRegistry::is_default(Some(&tab.cookie_store_id))
                && !group.if_not_default_container_re_open_in_new)
        {
            return Ok(NavigationVerdict::Allow);
        }

        let window_id = self
            .state
            .cache
            .get_window_id(group.id)
            .unwrap_or(tab.window_id);
        let loaded = self.state.is_group_loaded(group.id);

        tracing::info!(tab_id = %tab.id, group_id = %group.id, container, "Reopening tab in group container");
        let created = self
            .tabs
            .create(NewTab {
                url: Some(tab.url.clone()),
                window_id: Some(window_id),
                index: Some(tab.index),
                active: tab.active,
                cookie_store_id: Some(container.to_string()),
                group_id: Some(group.id),
                ..NewTab::default()
            })
            .await?;

        if !loaded || tab.hidden {
            self.tabs.hide_excluded(&[created.id]).await?;
        }
        self.tabs.remove(&[tab.id]).await?;
        self.updates.schedule(group.id);
        Ok(NavigationVerdict::Cancel)
    }

    // A blank tab whose title matches another group's rules is moved there
    // once it finishes loading
    pub(super) async fn catch_loaded_blank_tab(&self, tab: &Tab) -> Result<()> {
        if tab.url != "about:blank" {
            return Ok(());
        }
        let Some(group_id) = self.state.cache.tab_group(tab.id) else {
            return Ok(());
        };

        let groups = self.store.load_all().await?;
        let sticky = groups
            .iter()
            .find(|g| g.id == group_id)
            .is_none_or(|g| g.is_sticky);
        if sticky {
            return Ok(());
        }

        if let Some(destination) = self.store.catch_rules(&groups).find(tab, true)
            && destination != group_id
        {
            self.lazy_moves.push(destination, tab.id);
        }
        Ok(())
    }
}
