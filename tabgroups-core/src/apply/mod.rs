//! Loading a group into a window
//!
//! [`GroupApplier::apply_group`] shows the target group's tabs in a window
//! and hides the group that was there. A group already loaded somewhere is
//! only focused. Event delivery is paused while tabs move, and a second
//! application in the same window is refused until the first finishes.

mod guard;

use std::sync::Arc;

use tracing::Instrument;

pub use guard::{InFlight, InFlightGuard};

use crate::error::ApplyError;
use crate::groups::{GroupStore, GroupUpdates};
use crate::host::TabQuery;
use crate::messages::{BgMessage, GroupUpdate};
use crate::models::{ChangeInfo, Group, GroupId, Tab, TabId, WindowId};
use crate::state::SessionState;
use crate::tabs::TabOps;
use crate::toolbar::Toolbar;
use crate::tracing::span_names;
use crate::windows;

const SHARING_VETO_MESSAGE: &str =
    "It is not possible to switch the group because a tab is sharing the camera, microphone or screen";

/// Direction of group navigation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Forward
    Next,
    /// Backward
    Prev,
}

/// Group `step` positions away from `current`, wrapping around
///
/// An unknown `current` counts as sitting just outside the list, so
/// [`Step::Next`] starts at the first group and [`Step::Prev`] at the last.
#[must_use]
pub fn position_target(step: Step, group_ids: &[GroupId], current: Option<GroupId>) -> Option<GroupId> {
    let len = group_ids.len();
    if len <= 1 {
        return None;
    }
    let index = current
        .and_then(|id| group_ids.iter().position(|g| *g == id))
        .unwrap_or(match step {
            Step::Next => len - 1,
            Step::Prev => 0,
        });
    let target = match step {
        Step::Next => (index + 1) % len,
        Step::Prev => (index + len - 1) % len,
    };
    group_ids.get(target).copied()
}

/// Runs group applications
pub struct GroupApplier {
    state: Arc<SessionState>,
    tabs: Arc<TabOps>,
    store: Arc<GroupStore>,
    toolbar: Arc<Toolbar>,
    updates: Arc<GroupUpdates>,
    in_flight: InFlight,
}

impl GroupApplier {
    /// Creates the applier
    #[must_use]
    pub fn new(
        state: Arc<SessionState>,
        tabs: Arc<TabOps>,
        store: Arc<GroupStore>,
        toolbar: Arc<Toolbar>,
        updates: Arc<GroupUpdates>,
    ) -> Self {
        Self {
            state,
            tabs,
            store,
            toolbar,
            updates,
            in_flight: InFlight::new(),
        }
    }

    /// Returns true while a group is being loaded into `window_id`
    #[must_use]
    pub fn is_loading(&self, window_id: WindowId) -> bool {
        self.in_flight.contains(window_id)
    }

    /// Loads `group_id` into `window_id` (the last focused normal window
    /// when `None`), activating `active_tab` if given
    ///
    /// Returns `false` when the window is busy, the switch was vetoed or
    /// failed. Failures are reported, never propagated. A `group-loaded`
    /// message is broadcast on every exit past the busy check.
    pub async fn apply_group(
        &self,
        window_id: Option<WindowId>,
        group_id: GroupId,
        active_tab: Option<TabId>,
        from_history: bool,
    ) -> bool {
        let window_id = match window_id {
            Some(id) => id,
            None => match windows::last_focused_normal(&self.state).await {
                Ok(window) => window.id,
                Err(e) => {
                    self.state.reporter.report("apply group", &e).await;
                    return false;
                }
            },
        };

        let Some(_in_flight) = self.in_flight.try_enter(window_id) else {
            tracing::debug!(group_id = %group_id, window_id = %window_id, "Window is busy, apply skipped");
            return false;
        };

        let span = tracing::info_span!(
            span_names::APPLY_GROUP,
            group_id = %group_id,
            window_id = %window_id,
        );
        let result = self
            .load(window_id, group_id, active_tab, from_history)
            .instrument(span)
            .await;

        let ok = match result {
            Ok(()) => true,
            Err(ApplyError::Vetoed(reason)) => {
                tracing::info!(group_id = %group_id, %reason, "Group switch vetoed");
                false
            }
            Err(e) => {
                self.recover(window_id, &e).await;
                false
            }
        };

        self.state.send(BgMessage::GroupLoaded {
            group_id,
            window_id,
            ok,
        });
        ok
    }

    /// Loads the group `step` positions away from `current` in `group_ids`
    ///
    /// Returns `false` when there is nothing to switch to.
    pub async fn apply_by_position(
        &self,
        step: Step,
        group_ids: &[GroupId],
        current: Option<GroupId>,
    ) -> bool {
        match position_target(step, group_ids, current) {
            Some(target) => self.apply_group(None, target, None, false).await,
            None => false,
        }
    }

    /// Loads the next or previous group of the navigation history
    ///
    /// Returns `false` at either end of the history.
    pub async fn apply_by_history(&self, step: Step, group_ids: &[GroupId]) -> bool {
        if group_ids.len() <= 1 {
            return false;
        }
        let target = self.state.with_history(|history| match step {
            Step::Next => history.next(group_ids),
            Step::Prev => history.prev(group_ids),
        });
        match target {
            Some(group_id) => self.apply_group(None, group_id, None, true).await,
            None => false,
        }
    }

    async fn load(
        &self,
        window_id: WindowId,
        group_id: GroupId,
        active_tab: Option<TabId>,
        from_history: bool,
    ) -> Result<(), ApplyError> {
        if let Some(group_window) = self.state.cache.get_window_id(group_id) {
            if let Some(tab_id) = active_tab {
                self.tabs.set_active(Some(tab_id), &[]).await?;
            }
            self.state.ports.windows.focus(group_window).await?;
            return Ok(());
        }

        let groups = self.store.load_with_tabs().await?;
        let mut group_to_show = groups
            .iter()
            .find(|g| g.id == group_id)
            .cloned()
            .ok_or(ApplyError::GroupNotFound(group_id))?;
        let group_to_hide = self
            .state
            .cache
            .get_window_group(window_id)
            .and_then(|id| groups.iter().find(|g| g.id == id))
            .cloned();

        if let Some(hide) = &group_to_hide
            && hide.tabs.iter().any(|t| !TabOps::is_can_be_hidden(t))
        {
            self.state.notify(SHARING_VETO_MESSAGE).await;
            return Err(ApplyError::Vetoed(format!("group {} has a sharing tab", hide.id)));
        }

        if !from_history {
            self.state.with_history(|history| history.add(group_id));
        }

        self.toolbar.set_loading(Some(window_id)).await;
        let pause = self.state.gate.pause();

        self.show_tabs(window_id, &mut group_to_show, active_tab).await?;
        self.state.cache.set_window_group(window_id, group_id);

        if let Some(hide) = group_to_hide {
            self.hide_tabs(window_id, hide, group_to_show.tabs.is_empty())
                .await?;
        }

        let tabs = self.relabel_window(window_id, group_id).await?;
        self.state.send(BgMessage::GroupUpdated {
            group: GroupUpdate::tabs(group_id, tabs),
        });

        drop(pause);

        self.toolbar
            .show_group(window_id, Some(&group_to_show))
            .await?;
        self.toolbar.rebuild_menus(Some(window_id)).await?;
        tracing::info!(group_id = %group_id, window_id = %window_id, "Group loaded");
        Ok(())
    }

    async fn show_tabs(
        &self,
        window_id: WindowId,
        group: &mut Group,
        active_tab: Option<TabId>,
    ) -> Result<(), ApplyError> {
        if group.tabs.is_empty() {
            return Ok(());
        }

        let ids: Vec<TabId> = group.tabs.iter().map(|t| t.id).collect();
        if !group.tabs.iter().all(|t| t.window_id == window_id) {
            group.tabs = self.tabs.move_native(&ids, window_id, None).await?;
        }

        let shown = self.tabs.show(&ids).await?;
        if shown.len() != ids.len() {
            tracing::error!(
                assertion = true,
                expected = ids.len(),
                shown = shown.len(),
                "Not every tab was shown"
            );
        }

        if group.mute_tabs_when_group_close_and_restore_when_open {
            self.tabs.set_mute(&group.tabs, false).await?;
        }

        let pinned = self
            .tabs
            .query(TabQuery::in_window(window_id).pinned(true))
            .await?;
        if active_tab.is_some() || !pinned.iter().any(|t| t.active) {
            self.tabs.set_active(active_tab, &group.tabs).await?;
        }
        Ok(())
    }

    async fn hide_tabs(
        &self,
        window_id: WindowId,
        group: Group,
        nothing_shown: bool,
    ) -> Result<(), ApplyError> {
        let (manage_pages, tabs): (Vec<Tab>, Vec<Tab>) = group
            .tabs
            .iter()
            .cloned()
            .partition(|t| self.state.settings.is_manage_page(&t.url));

        if !tabs.is_empty() {
            if group.mute_tabs_when_group_close_and_restore_when_open {
                self.tabs.set_mute(&tabs, true).await?;
            }
            if nothing_shown {
                self.tabs.create_temp_active_tab(window_id, false).await?;
            }

            let ids: Vec<TabId> = tabs.iter().map(|t| t.id).collect();
            let hidden = self.tabs.hide(&ids).await?;
            if hidden.len() != ids.len() {
                tracing::error!(
                    assertion = true,
                    expected = ids.len(),
                    hidden = hidden.len(),
                    "Not every tab was hidden"
                );
            }

            if self.state.options().discard_tabs_after_hide
                && !group.dont_discard_tabs_after_hide_this_group
            {
                self.tabs.discard(&ids).await?;
                for id in ids {
                    self.state.send(BgMessage::tab_updated(
                        id,
                        ChangeInfo {
                            discarded: Some(true),
                            ..ChangeInfo::default()
                        },
                    ));
                }
            }
        }

        if !manage_pages.is_empty() {
            let ids: Vec<TabId> = manage_pages.iter().map(|t| t.id).collect();
            self.tabs.remove(&ids).await?;
            for id in ids {
                self.tabs.forget_removed(id);
            }
        }

        self.updates.schedule(group.id);
        Ok(())
    }

    // Tabs opened while no group was loaded join the new one
    async fn relabel_window(&self, window_id: WindowId, group_id: GroupId) -> Result<Vec<Tab>, ApplyError> {
        let mut tabs = self
            .tabs
            .query(TabQuery::in_window(window_id).pinned(false).hidden(false))
            .await?;
        for tab in &mut tabs {
            if tab.group_id() != Some(group_id) {
                self.state.cache.set_tab_group(tab.id, Some(group_id));
                tab.session.group_id = Some(group_id);
            }
        }
        Ok(tabs)
    }

    async fn recover(&self, window_id: WindowId, error: &ApplyError) {
        tracing::error!(window_id = %window_id, error = %error, "Group apply failed");
        if let Err(e) = self.toolbar.update(window_id).await {
            tracing::warn!(error = %e, "Failed to reset toolbar after apply failure");
        }
        self.state.gate.rearm();
        self.state.reporter.report("apply group", error).await;
    }
}

impl std::fmt::Debug for GroupApplier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupApplier")
            .field("in_flight", &self.in_flight)
            .finish_non_exhaustive()
    }
}
