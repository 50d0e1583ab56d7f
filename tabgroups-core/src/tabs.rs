//! Tab operations
//!
//! Wraps the host tab port with the session overlay: every tab returned is
//! hydrated from the session cache, and tabs the engine creates are labeled
//! with their group before anyone else sees them.

use std::sync::Arc;
use std::time::Duration;

use crate::containers::ContainerRegistry;
use crate::error::Result;
use crate::host::{CreateTabProps, TabQuery, TabUpdate};
use crate::messages::BgMessage;
use crate::models::{
    DEFAULT_COOKIE_STORE_ID, Group, GroupId, TEMPORARY_CONTAINER, Tab, TabId, WindowId,
    is_url_allowed_to_create, is_url_empty, normalize_fav_icon,
};
use crate::state::SessionState;

const TEMP_TAB_URL: &str = "about:blank";

/// Tab to create
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewTab {
    /// Url; dropped when the host refuses to open it
    pub url: Option<String>,
    /// Title shown while the tab is unloaded
    pub title: Option<String>,
    /// Target window
    pub window_id: Option<WindowId>,
    /// Position
    pub index: Option<u32>,
    /// Activate after creation
    pub active: bool,
    /// Create pinned
    pub pinned: bool,
    /// Create unloaded
    pub discarded: bool,
    /// Container, or [`TEMPORARY_CONTAINER`] for a fresh one
    pub cookie_store_id: Option<String>,
    /// Group to label the tab with
    pub group_id: Option<GroupId>,
    /// Favicon stored in the session
    pub fav_icon_url: Option<String>,
    /// Thumbnail stored in the session
    pub thumbnail: Option<String>,
}

impl NewTab {
    /// Tab opened in `group`, in the group's container
    #[must_use]
    pub fn in_group(group: &Group) -> Self {
        Self {
            group_id: Some(group.id),
            cookie_store_id: group.new_tab_container.clone(),
            ..Self::default()
        }
    }

    /// Sets the url
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

/// Host tab commands with session bookkeeping
pub struct TabOps {
    state: Arc<SessionState>,
}

impl TabOps {
    /// Creates the operations over shared state
    #[must_use]
    pub fn new(state: Arc<SessionState>) -> Self {
        Self { state }
    }

    /// Lists tabs with their sessions
    ///
    /// # Errors
    ///
    /// Returns the host error if tabs cannot be listed.
    pub async fn query(&self, query: TabQuery) -> Result<Vec<Tab>> {
        let mut tabs = Vec::new();
        for tab in self.state.ports.tabs.query(query).await? {
            tabs.push(self.state.cache.load_tab_session(tab).await);
        }
        Ok(tabs)
    }

    /// Gets one tab with its session
    ///
    /// # Errors
    ///
    /// Returns the host error if the tab is gone.
    pub async fn get(&self, tab_id: TabId) -> Result<Tab> {
        let tab = self.state.ports.tabs.get(tab_id).await?;
        Ok(self.state.cache.load_tab_session(tab).await)
    }

    /// Active tab of a window
    ///
    /// # Errors
    ///
    /// Returns the host error if tabs cannot be listed.
    pub async fn get_active(&self, window_id: WindowId) -> Result<Option<Tab>> {
        let query = TabQuery::in_window(window_id).active(true);
        Ok(self.query(query).await?.into_iter().next())
    }

    /// Creates a tab and labels it
    ///
    /// The container is normalized; the temporary marker allocates a new
    /// temporary container. Pinned tabs are never labeled.
    ///
    /// # Errors
    ///
    /// Returns the host error if the tab or its container cannot be created.
    pub async fn create(&self, tab: NewTab) -> Result<Tab> {
        let url = tab.url.filter(|url| is_url_allowed_to_create(url, false));
        let discarded = tab.discarded
            && !tab.active
            && !tab.pinned
            && url.as_deref().is_some_and(|url| !is_url_empty(url));

        let cookie_store_id = if ContainerRegistry::is_default(tab.cookie_store_id.as_deref()) {
            None
        } else {
            match self
                .state
                .containers
                .normalize(tab.cookie_store_id.as_deref())
            {
                id if id == TEMPORARY_CONTAINER => {
                    Some(self.state.containers.create_temporary().await?)
                }
                id if id == DEFAULT_COOKIE_STORE_ID => None,
                id => Some(id),
            }
        };

        let props = CreateTabProps {
            url,
            title: if discarded { tab.title } else { None },
            window_id: tab.window_id,
            index: tab.index,
            active: tab.active,
            pinned: tab.pinned,
            discarded,
            cookie_store_id,
        };
        let created = self.state.ports.tabs.create(props).await?;

        let cache = &self.state.cache;
        cache.set_tab(&created);
        if let Some(group_id) = tab.group_id {
            cache.set_tab_group(created.id, Some(group_id));
        }
        if let Some(fav_icon_url) = tab.fav_icon_url {
            cache.set_tab_fav_icon(created.id, normalize_fav_icon(Some(&fav_icon_url)));
        }
        if tab.thumbnail.is_some() {
            cache.set_tab_thumbnail(created.id, tab.thumbnail);
        }

        tracing::debug!(tab_id = %created.id, group_id = ?tab.group_id, "Tab created");
        Ok(cache.tab(created.id).unwrap_or(created))
    }

    /// Creates many tabs, optionally with events paused and hidden afterwards
    ///
    /// # Errors
    ///
    /// Returns the first host error; tabs created before it stay open.
    pub async fn create_tabs_safe(
        &self,
        tabs: Vec<NewTab>,
        hide: bool,
        pause_events: bool,
    ) -> Result<Vec<Tab>> {
        let _pause = pause_events.then(|| self.state.gate.pause());

        let mut created = futures::future::try_join_all(tabs.into_iter().map(|mut tab| {
            tab.index = None;
            self.create(tab)
        }))
        .await?;

        if hide {
            let ids: Vec<TabId> = created.iter().filter(|t| !t.pinned).map(|t| t.id).collect();
            let hidden = self.hide(&ids).await?;
            for tab in &mut created {
                if hidden.contains(&tab.id) {
                    tab.hidden = true;
                    self.state.cache.set_tab(tab);
                }
            }
        }

        Ok(created)
    }

    /// Moves tabs into a window, appended when `index` is `None`
    ///
    /// # Errors
    ///
    /// Returns the host error if the move fails.
    pub async fn move_native(
        &self,
        tab_ids: &[TabId],
        window_id: WindowId,
        index: Option<u32>,
    ) -> Result<Vec<Tab>> {
        if tab_ids.is_empty() {
            return Ok(Vec::new());
        }

        let moved = self
            .state
            .ports
            .tabs
            .move_tabs(tab_ids, window_id, index)
            .await?;
        let mut result = Vec::with_capacity(moved.len());
        for tab in moved {
            result.push(self.state.cache.load_tab_session(tab).await);
        }
        Ok(result)
    }

    /// Moves tabs into a group with a single host move
    ///
    /// Tabs go to the window the group is loaded in, or stay in the first
    /// tab's window. They become visible when the group is loaded and
    /// hidden otherwise; an active tab is replaced first. Pinned tabs are
    /// skipped. Returns the tabs that changed group.
    ///
    /// # Errors
    ///
    /// Returns the host error if a command fails.
    pub async fn move_to_group(&self, tab_ids: &[TabId], group_id: GroupId) -> Result<Vec<Tab>> {
        let mut tabs = Vec::new();
        for &id in tab_ids {
            match self.get(id).await {
                Ok(tab) if !tab.pinned => tabs.push(tab),
                Ok(_) => tracing::debug!(tab_id = %id, "Pinned tab not moved"),
                Err(e) => tracing::debug!(tab_id = %id, error = %e, "Tab vanished before move"),
            }
        }
        let Some(first) = tabs.first() else {
            return Ok(Vec::new());
        };

        let group_window = self.state.cache.get_window_id(group_id);
        let window_id = group_window.unwrap_or(first.window_id);
        let ids: Vec<TabId> = tabs.iter().map(|t| t.id).collect();
        let _exclude = self.state.exclude.guard(ids.iter().copied());

        for tab in &tabs {
            self.state.cache.set_tab_group(tab.id, Some(group_id));
        }

        if group_window.is_none() {
            self.replace_active_tabs(&tabs).await?;
        }

        let moved = self.move_native(&ids, window_id, None).await?;

        if group_window.is_some() {
            self.show(&ids).await?;
        } else {
            self.hide(&ids).await?;
        }

        tracing::debug!(group_id = %group_id, count = moved.len(), "Tabs moved into group");
        Ok(moved)
    }

    // An active tab cannot be hidden, so focus moves to a visible tab that
    // stays, or to a temporary one
    async fn replace_active_tabs(&self, leaving: &[Tab]) -> Result<()> {
        for tab in leaving.iter().filter(|t| t.active) {
            let candidates: Vec<Tab> = self
                .query(TabQuery::in_window(tab.window_id).hidden(false).pinned(false))
                .await?
                .into_iter()
                .filter(|t| !leaving.iter().any(|l| l.id == t.id))
                .collect();

            if candidates.is_empty() {
                self.create_temp_active_tab(tab.window_id, false).await?;
            } else {
                self.set_active(None, &candidates).await?;
            }
        }
        Ok(())
    }

    /// Shows tabs, returning the ids that are visible now
    ///
    /// # Errors
    ///
    /// Returns the host error if the command fails.
    pub async fn show(&self, tab_ids: &[TabId]) -> Result<Vec<TabId>> {
        if tab_ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.state.ports.tabs.show(tab_ids).await?)
    }

    /// Hides tabs, returning the ids that are hidden now
    ///
    /// # Errors
    ///
    /// Returns the host error if the command fails.
    pub async fn hide(&self, tab_ids: &[TabId]) -> Result<Vec<TabId>> {
        if tab_ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.state.ports.tabs.hide(tab_ids).await?)
    }

    /// Hides tabs without their events reaching the router
    ///
    /// # Errors
    ///
    /// Returns the host error if the command fails.
    pub async fn hide_excluded(&self, tab_ids: &[TabId]) -> Result<Vec<TabId>> {
        let _exclude = self.state.exclude.guard(tab_ids.iter().copied());
        self.hide(tab_ids).await
    }

    /// Activates `tab_id`, or the most recently used of `candidates`
    ///
    /// # Errors
    ///
    /// Returns the host error if the tab cannot be activated.
    pub async fn set_active(&self, tab_id: Option<TabId>, candidates: &[Tab]) -> Result<Option<TabId>> {
        let target = tab_id.or_else(|| {
            candidates
                .iter()
                .max_by_key(|t| t.last_accessed)
                .map(|t| t.id)
        });

        if let Some(id) = target {
            self.state
                .ports
                .tabs
                .update(
                    id,
                    TabUpdate {
                        active: Some(true),
                        ..TabUpdate::default()
                    },
                )
                .await?;
        }
        Ok(target)
    }

    /// Mutes or unmutes tabs that are not in that state yet
    ///
    /// # Errors
    ///
    /// Returns the host error if a tab cannot be updated.
    pub async fn set_mute(&self, tabs: &[Tab], muted: bool) -> Result<()> {
        for tab in tabs.iter().filter(|t| t.muted != muted) {
            self.state
                .ports
                .tabs
                .update(
                    tab.id,
                    TabUpdate {
                        muted: Some(muted),
                        ..TabUpdate::default()
                    },
                )
                .await?;
        }
        Ok(())
    }

    /// Unloads tabs
    ///
    /// # Errors
    ///
    /// Returns the host error if the command fails.
    pub async fn discard(&self, tab_ids: &[TabId]) -> Result<()> {
        if tab_ids.is_empty() {
            return Ok(());
        }
        Ok(self.state.ports.tabs.discard(tab_ids).await?)
    }

    /// Reloads tabs
    ///
    /// # Errors
    ///
    /// Returns the first host error.
    pub async fn reload(&self, tab_ids: &[TabId], bypass_cache: bool) -> Result<()> {
        for &id in tab_ids {
            self.state.ports.tabs.reload(id, bypass_cache).await?;
        }
        Ok(())
    }

    /// Closes tabs
    ///
    /// # Errors
    ///
    /// Returns the host error if the command fails.
    pub async fn remove(&self, tab_ids: &[TabId]) -> Result<()> {
        if tab_ids.is_empty() {
            return Ok(());
        }
        Ok(self.state.ports.tabs.remove(tab_ids).await?)
    }

    /// Makes sure the window keeps an active tab while its tabs are hidden
    ///
    /// With pinned tabs present the most recent one is activated (if none
    /// is active yet) and `None` is returned. Otherwise a blank tab is
    /// created, pinned when `pinned` is set.
    ///
    /// # Errors
    ///
    /// Returns the host error if a command fails.
    pub async fn create_temp_active_tab(&self, window_id: WindowId, pinned: bool) -> Result<Option<Tab>> {
        let pinned_tabs = self
            .state
            .ports
            .tabs
            .query(TabQuery::in_window(window_id).pinned(true))
            .await?;

        if !pinned_tabs.is_empty() {
            if !pinned_tabs.iter().any(|t| t.active) {
                self.set_active(None, &pinned_tabs).await?;
            }
            return Ok(None);
        }

        let tab = self
            .create(NewTab {
                url: Some(TEMP_TAB_URL.to_string()),
                window_id: Some(window_id),
                active: true,
                pinned,
                ..NewTab::default()
            })
            .await?;
        Ok(Some(tab))
    }

    /// Returns true if the host will hide the tab
    #[must_use]
    pub const fn is_can_be_hidden(tab: &Tab) -> bool {
        tab.can_be_hidden()
    }

    /// Bookkeeping for a closed tab
    ///
    /// Broadcasts `tab-removed`, schedules the temporary container check
    /// and drops the tab from the cache.
    pub fn forget_removed(&self, tab_id: TabId) {
        self.state.send(BgMessage::TabRemoved { tab_id });

        if let Some(cookie_store_id) = self.state.cache.tab_cookie_store_id(tab_id)
            && self.state.containers.is_temporary(&cookie_store_id)
            && let Ok(handle) = tokio::runtime::Handle::try_current()
        {
            let state = Arc::clone(&self.state);
            let delay = Duration::from_millis(state.settings.timing.temporary_container_check_ms);
            handle.spawn(async move {
                tokio::time::sleep(delay).await;
                state
                    .containers
                    .check_temporary(&cookie_store_id, Some(tab_id))
                    .await;
            });
        }

        self.state.cache.remove_tab(tab_id);
    }
}

impl std::fmt::Debug for TabOps {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TabOps").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::host::{HostCall, HostPorts, InMemoryHost};
    use crate::storage::MemoryStorage;

    fn ops(host: &Arc<InMemoryHost>) -> (Arc<SessionState>, TabOps) {
        let state = Arc::new(SessionState::new(
            HostPorts::in_memory(host, Arc::new(MemoryStorage::new())),
            Settings::default(),
        ));
        (Arc::clone(&state), TabOps::new(state))
    }

    #[tokio::test]
    async fn create_labels_tab_with_group() {
        let host = Arc::new(InMemoryHost::new());
        let w = host.seed_window();
        let (state, ops) = ops(&host);

        let tab = ops
            .create(NewTab {
                url: Some("https://a.test".into()),
                window_id: Some(w),
                group_id: Some(GroupId(4)),
                fav_icon_url: Some("chrome://icon".into()),
                ..NewTab::default()
            })
            .await
            .unwrap();

        assert_eq!(tab.group_id(), Some(GroupId(4)));
        let session = state.cache.get_tab_session(tab.id).unwrap();
        assert_eq!(session.fav_icon_url.as_deref(), Some(crate::models::DEFAULT_FAV_ICON));
    }

    #[tokio::test]
    async fn create_drops_forbidden_urls() {
        let host = Arc::new(InMemoryHost::new());
        let w = host.seed_window();
        let (_, ops) = ops(&host);

        let tab = ops
            .create(NewTab {
                url: Some("about:config".into()),
                window_id: Some(w),
                ..NewTab::default()
            })
            .await
            .unwrap();
        assert_eq!(tab.url, "about:newtab");
    }

    #[tokio::test]
    async fn temporary_marker_allocates_container() {
        let host = Arc::new(InMemoryHost::new());
        let w = host.seed_window();
        let (state, ops) = ops(&host);
        state.containers.init().await.unwrap();

        let tab = ops
            .create(NewTab {
                url: Some("https://a.test".into()),
                window_id: Some(w),
                cookie_store_id: Some(TEMPORARY_CONTAINER.into()),
                ..NewTab::default()
            })
            .await
            .unwrap();

        assert!(state.containers.is_temporary(&tab.cookie_store_id));
        assert_ne!(tab.cookie_store_id, TEMPORARY_CONTAINER);
    }

    #[tokio::test]
    async fn set_active_prefers_most_recent() {
        let host = Arc::new(InMemoryHost::new());
        let w = host.seed_window();
        host.seed_tab(w, "https://a.test");
        let (_, ops) = ops(&host);
        let mut older = host.seed_tab(w, "https://b.test");
        let mut newer = host.seed_tab(w, "https://c.test");
        older.last_accessed = 1;
        newer.last_accessed = 5;

        let chosen = ops.set_active(None, &[older, newer.clone()]).await.unwrap();
        assert_eq!(chosen, Some(newer.id));
        assert!(host.tab(newer.id).unwrap().active);
    }

    #[tokio::test]
    async fn temp_active_tab_prefers_pinned() {
        let host = Arc::new(InMemoryHost::new());
        let w = host.seed_window();
        let first = host.seed_tab(w, "https://a.test");
        let (_, ops) = ops(&host);

        let created = ops.create_temp_active_tab(w, false).await.unwrap();
        assert!(created.is_some());

        ops.state
            .ports
            .tabs
            .update(
                first.id,
                TabUpdate {
                    pinned: Some(true),
                    ..TabUpdate::default()
                },
            )
            .await
            .unwrap();
        assert!(ops.create_temp_active_tab(w, false).await.unwrap().is_none());
        assert!(host.tab(first.id).unwrap().active);
    }

    #[tokio::test]
    async fn move_to_unloaded_group_issues_one_move_and_hides() {
        let host = Arc::new(InMemoryHost::new());
        let w = host.seed_window();
        let active = host.seed_tab(w, "https://a.test");
        let b = host.seed_tab(w, "https://b.test");
        let (state, ops) = ops(&host);
        ops.query(TabQuery::all()).await.unwrap();
        host.clear_calls();

        ops.move_to_group(&[active.id, b.id], GroupId(9)).await.unwrap();

        let moves = host
            .calls()
            .into_iter()
            .filter(|c| matches!(c, HostCall::MoveTabs { .. }))
            .count();
        assert_eq!(moves, 1);
        assert!(host.tab(b.id).unwrap().hidden);
        assert!(host.tab(active.id).unwrap().hidden);
        assert_eq!(state.cache.tab_group(b.id), Some(GroupId(9)));
        assert!(state.exclude.is_empty());
    }
}
