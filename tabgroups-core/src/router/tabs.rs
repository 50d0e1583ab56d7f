//! Tab event handlers

use crate::error::Result;
use crate::messages::BgMessage;
use crate::models::{ChangeInfo, GroupId, Tab, TabId, WindowId, normalize_fav_icon};

use super::EventRouter;

impl EventRouter {
    pub(super) fn on_tab_created(&self, tab: &Tab) {
        if self.state.is_tab_ignored(tab.id, Some(tab.window_id)) {
            return;
        }

        let cache = &self.state.cache;
        cache.set_tab(tab);
        if tab.pinned {
            return;
        }

        // Tabs the engine creates are labeled by the creator
        if let Some(group_id) = cache.tab_group(tab.id) {
            self.updates.schedule(group_id);
            return;
        }

        if let Some(group_id) = cache.get_window_group(tab.window_id) {
            cache.set_tab_group(tab.id, Some(group_id));
            self.updates.schedule(group_id);
        }
    }

    pub(super) async fn on_tab_updated(&self, tab_id: TabId, mut change: ChangeInfo, tab: Tab) -> Result<()> {
        if self.state.is_tab_ignored(tab_id, Some(tab.window_id)) {
            return Ok(());
        }
        if tab.pinned && change.pinned.is_none() {
            return Ok(());
        }

        let cache = &self.state.cache;
        if !cache.has_tab(tab_id) {
            tracing::debug!(tab_id = %tab_id, "Update for a tab not yet created");
            return Ok(());
        }

        let tab_group = cache.tab_group(tab_id);
        let window_group = cache.get_window_group(tab.window_id);
        cache.set_tab(&tab);

        if change.discarded.is_none() {
            change.discarded = Some(false);
        }

        if let Some(fav_icon_url) = change.fav_icon_url.take()
            && (tab_group.is_some() || window_group.is_some())
        {
            let normalized = normalize_fav_icon(Some(&fav_icon_url));
            cache.set_tab_fav_icon(tab_id, normalized.clone());
            change.fav_icon_url = Some(normalized);
        }

        if change.pinned.is_some() || change.hidden.is_some() {
            return self
                .on_tab_visibility_changed(&tab, &change, tab_group, window_group)
                .await;
        }

        if tab_group.is_some() || window_group.is_some() {
            if change.is_loaded() {
                self.catch_loaded_blank_tab(&tab).await?;
            }
            self.state.send(BgMessage::tab_updated(tab_id, change));
        }
        Ok(())
    }

    // Pinning or hiding takes a tab out of its group; unpinning or showing
    // puts it into the window's group, or loads the tab's own group
    async fn on_tab_visibility_changed(
        &self,
        tab: &Tab,
        change: &ChangeInfo,
        tab_group: Option<GroupId>,
        window_group: Option<GroupId>,
    ) -> Result<()> {
        let cache = &self.state.cache;

        if change.pinned == Some(true) || change.hidden == Some(true) {
            if let Some(group_id) = tab_group {
                cache.remove_tab_group(tab.id);
                self.state.send(BgMessage::TabRemoved { tab_id: tab.id });
                self.updates.schedule(group_id);
            }
            return Ok(());
        }

        if change.pinned == Some(false) {
            cache.set_tab_group(tab.id, window_group);
        } else if change.hidden == Some(false) {
            if let Some(group_id) = tab_group
                && Some(group_id) != window_group
            {
                self.applier
                    .apply_group(Some(tab.window_id), group_id, Some(tab.id), false)
                    .await;
                return Ok(());
            }
            cache.set_tab_group(tab.id, window_group);
        }

        if let Some(group_id) = window_group
            && let Some(tab) = cache.tab(tab.id)
        {
            self.state.send(BgMessage::TabAdded { tab });
            self.updates.schedule(group_id);
        }
        Ok(())
    }

    pub(super) fn on_tab_removed(&self, tab_id: TabId, window_id: WindowId, is_window_closing: bool) {
        if self.state.is_tab_ignored(tab_id, Some(window_id)) {
            return;
        }

        let group_id = self.state.cache.tab_group(tab_id);
        if is_window_closing {
            self.state.send(BgMessage::TabRemoved { tab_id });
            Self::lock(&self.closing_tabs).push(tab_id);
        } else {
            self.tabs.forget_removed(tab_id);
        }

        if let Some(group_id) = group_id {
            self.updates.schedule(group_id);
        }
    }

    pub(super) fn on_tab_moved(&self, tab_id: TabId) {
        if self.state.exclude.contains(tab_id) {
            return;
        }
        if let Some(group_id) = self.state.cache.tab_group(tab_id) {
            self.updates.schedule(group_id);
        }
    }

    pub(super) fn on_tab_attached(&self, tab_id: TabId, window_id: WindowId) {
        if self.state.is_tab_ignored(tab_id, Some(window_id)) {
            return;
        }

        let cache = &self.state.cache;
        let previous = cache.tab_group(tab_id);
        let group_id = cache.get_window_group(window_id);
        cache.set_tab_group(tab_id, group_id);

        self.updates.schedule_all(previous.into_iter().chain(group_id));
    }

    pub(super) fn on_tab_activated(&self, tab_id: TabId, previous_tab_id: Option<TabId>) {
        let cache = &self.state.cache;
        let activated = [(Some(tab_id), true), (previous_tab_id, false)];

        for (id, active) in activated {
            if let Some(id) = id
                && cache.tab_group(id).is_some()
            {
                self.state.send(BgMessage::tab_updated(
                    id,
                    ChangeInfo {
                        active: Some(active),
                        ..ChangeInfo::default()
                    },
                ));
            }
        }
    }
}
