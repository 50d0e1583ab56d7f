//! Authoritative tab→group and window→group mapping
//!
//! All mutations are synchronous and in-memory. Each one is mirrored into
//! the host session-values store by a detached task; losing a write because
//! the process dies in between is accepted.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::host::SessionValuesPort;
use crate::models::{GroupId, Tab, TabId, TabSession, Window, WindowId, WindowSession};

#[derive(Default)]
struct CacheState {
    tabs: HashMap<TabId, Tab>,
    windows: HashMap<WindowId, WindowSession>,
    group_windows: HashMap<GroupId, WindowId>,
}

impl CacheState {
    fn unlink_window(&mut self, window_id: WindowId) -> Option<GroupId> {
        let group_id = self
            .windows
            .get_mut(&window_id)
            .and_then(|session| session.group_id.take())?;
        if self.group_windows.get(&group_id) == Some(&window_id) {
            self.group_windows.remove(&group_id);
        }
        Some(group_id)
    }
}

/// In-memory session state shared by every component
pub struct SessionCache {
    state: Mutex<CacheState>,
    values: Arc<dyn SessionValuesPort>,
}

impl SessionCache {
    /// Creates an empty cache persisting into `values`
    #[must_use]
    pub fn new(values: Arc<dyn SessionValuesPort>) -> Self {
        Self {
            state: Mutex::new(CacheState::default()),
            values,
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist<F, Fut>(&self, what: &'static str, write: F)
    where
        F: FnOnce(Arc<dyn SessionValuesPort>) -> Fut,
        Fut: Future<Output = crate::error::HostResult<()>> + Send + 'static,
    {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let fut = write(Arc::clone(&self.values));
        handle.spawn(async move {
            if let Err(e) = fut.await {
                tracing::debug!(error = %e, what, "Session value write failed");
            }
        });
    }

    fn persist_tab(&self, tab_id: TabId, session: TabSession) {
        self.persist("tab", move |values| async move {
            values.set_tab_session(tab_id, session).await
        });
    }

    // Windows

    /// Group loaded in a window
    #[must_use]
    pub fn get_window_group(&self, window_id: WindowId) -> Option<GroupId> {
        self.lock()
            .windows
            .get(&window_id)
            .and_then(|session| session.group_id)
    }

    /// Window a group is loaded in (reverse index)
    #[must_use]
    pub fn get_window_id(&self, group_id: GroupId) -> Option<WindowId> {
        self.lock().group_windows.get(&group_id).copied()
    }

    /// Loads a group in a window
    ///
    /// A group is loaded in at most one window: if it was loaded elsewhere,
    /// that window loses it.
    pub fn set_window_group(&self, window_id: WindowId, group_id: GroupId) {
        let previous_window = {
            let mut state = self.lock();
            state.unlink_window(window_id);

            let previous = state
                .group_windows
                .insert(group_id, window_id)
                .filter(|&w| w != window_id);
            if let Some(other) = previous
                && let Some(session) = state.windows.get_mut(&other)
            {
                session.group_id = None;
            }

            state.windows.entry(window_id).or_default().group_id = Some(group_id);
            previous
        };

        if let Some(other) = previous_window {
            tracing::warn!(
                group_id = %group_id,
                from = %other,
                to = %window_id,
                "Group was loaded in another window"
            );
            self.persist("window", move |values| async move {
                values.remove_window_group(other).await
            });
        }
        self.persist("window", move |values| async move {
            values.set_window_group(window_id, group_id).await
        });
    }

    /// Unloads the group of a window
    pub fn remove_window_group(&self, window_id: WindowId) {
        self.lock().unlink_window(window_id);
        self.persist("window", move |values| async move {
            values.remove_window_group(window_id).await
        });
    }

    /// Forgets a closed window; stored values stay with the window
    pub fn remove_window(&self, window_id: WindowId) {
        let mut state = self.lock();
        state.unlink_window(window_id);
        state.windows.remove(&window_id);
    }

    /// Every loaded (window, group) pair
    #[must_use]
    pub fn loaded_groups(&self) -> Vec<(WindowId, GroupId)> {
        let state = self.lock();
        let mut pairs: Vec<_> = state
            .windows
            .iter()
            .filter_map(|(&w, session)| session.group_id.map(|g| (w, g)))
            .collect();
        pairs.sort();
        pairs
    }

    /// Hydrates a host window with its session, from the cache or the
    /// host's stored values
    pub async fn load_window_session(&self, mut window: Window) -> Window {
        let cached = self.lock().windows.get(&window.id).copied();
        if let Some(session) = cached {
            window.session = session;
            return window;
        }

        let stored = match self.values.get_window_group(window.id).await {
            Ok(group_id) => group_id,
            Err(e) => {
                tracing::debug!(window_id = %window.id, error = %e, "No stored window session");
                None
            }
        };

        let mut state = self.lock();
        // Another task may have loaded it while we were reading
        if let Some(session) = state.windows.get(&window.id).copied() {
            window.session = session;
            return window;
        }

        let session = WindowSession {
            group_id: stored.filter(|g| !state.group_windows.contains_key(g)),
        };
        if let Some(group_id) = session.group_id {
            state.group_windows.insert(group_id, window.id);
        }
        state.windows.insert(window.id, session);
        window.session = session;
        window
    }

    // Tabs

    /// Session of a tab
    #[must_use]
    pub fn get_tab_session(&self, tab_id: TabId) -> Option<TabSession> {
        self.lock().tabs.get(&tab_id).map(|tab| tab.session.clone())
    }

    /// Group of a tab
    #[must_use]
    pub fn tab_group(&self, tab_id: TabId) -> Option<GroupId> {
        self.lock()
            .tabs
            .get(&tab_id)
            .and_then(|tab| tab.session.group_id)
    }

    /// Cached copy of a tab with its session
    #[must_use]
    pub fn tab(&self, tab_id: TabId) -> Option<Tab> {
        self.lock().tabs.get(&tab_id).cloned()
    }

    /// Container of a cached tab
    #[must_use]
    pub fn tab_cookie_store_id(&self, tab_id: TabId) -> Option<String> {
        self.lock()
            .tabs
            .get(&tab_id)
            .map(|tab| tab.cookie_store_id.clone())
    }

    /// Returns true if the tab is cached
    #[must_use]
    pub fn has_tab(&self, tab_id: TabId) -> bool {
        self.lock().tabs.contains_key(&tab_id)
    }

    /// Ids of every cached tab
    #[must_use]
    pub fn tab_ids(&self) -> Vec<TabId> {
        let mut ids: Vec<_> = self.lock().tabs.keys().copied().collect();
        ids.sort();
        ids
    }

    /// Caches host fields of a tab, keeping its cached session
    ///
    /// A tab seen for the first time takes the session it carries. Pinned
    /// tabs lose their group.
    pub fn set_tab(&self, tab: &Tab) {
        let cleared = {
            let mut state = self.lock();
            let mut entry = tab.clone();
            if let Some(existing) = state.tabs.get(&tab.id) {
                entry.session = existing.session.clone();
            }
            let cleared = entry.pinned && entry.session.group_id.take().is_some();
            let session = entry.session.clone();
            state.tabs.insert(tab.id, entry);
            cleared.then_some(session)
        };

        if let Some(session) = cleared {
            self.persist_tab(tab.id, session);
        }
    }

    /// Assigns a tab to a group; ignored for pinned tabs
    ///
    /// `None` removes the assignment. Returns `true` if the cache changed.
    pub fn set_tab_group(&self, tab_id: TabId, group_id: Option<GroupId>) -> bool {
        let session = {
            let mut state = self.lock();
            let Some(tab) = state.tabs.get_mut(&tab_id) else {
                return false;
            };
            if tab.pinned && group_id.is_some() {
                return false;
            }
            if tab.session.group_id == group_id {
                return false;
            }
            tab.session.group_id = group_id;
            tab.session.clone()
        };

        self.persist_tab(tab_id, session);
        true
    }

    /// Removes a tab from its group
    pub fn remove_tab_group(&self, tab_id: TabId) -> bool {
        self.set_tab_group(tab_id, None)
    }

    /// Stores a normalized favicon
    pub fn set_tab_fav_icon(&self, tab_id: TabId, fav_icon_url: String) {
        self.update_session(tab_id, |session| {
            session.fav_icon_url = Some(fav_icon_url);
        });
    }

    /// Stores a thumbnail
    pub fn set_tab_thumbnail(&self, tab_id: TabId, thumbnail: Option<String>) {
        self.update_session(tab_id, |session| session.thumbnail = thumbnail);
    }

    fn update_session(&self, tab_id: TabId, update: impl FnOnce(&mut TabSession)) {
        let session = {
            let mut state = self.lock();
            let Some(tab) = state.tabs.get_mut(&tab_id) else {
                return;
            };
            let before = tab.session.clone();
            update(&mut tab.session);
            if tab.session == before {
                return;
            }
            tab.session.clone()
        };
        self.persist_tab(tab_id, session);
    }

    /// Forgets a closed tab
    pub fn remove_tab(&self, tab_id: TabId) -> Option<Tab> {
        self.lock().tabs.remove(&tab_id)
    }

    /// Takes tabs closed together with their window so they can be
    /// recreated; only grouped tabs are returned
    pub fn take_removed_tabs_for_create(&self, tab_ids: &[TabId]) -> Vec<Tab> {
        let mut state = self.lock();
        tab_ids
            .iter()
            .filter_map(|id| state.tabs.remove(id))
            .filter(|tab| tab.session.group_id.is_some())
            .collect()
    }

    /// Hydrates a host tab with its session, from the cache or the host's
    /// stored values, and caches it
    pub async fn load_tab_session(&self, mut tab: Tab) -> Tab {
        let cached = self.lock().tabs.get(&tab.id).map(|t| t.session.clone());
        if let Some(session) = cached {
            tab.session = session;
            self.set_tab(&tab);
            return tab;
        }

        let stored = match self.values.get_tab_session(tab.id).await {
            Ok(session) => session.unwrap_or_default(),
            Err(e) => {
                tracing::debug!(tab_id = %tab.id, error = %e, "No stored tab session");
                TabSession::default()
            }
        };

        if !self.has_tab(tab.id) {
            tab.session = stored;
        } else if let Some(session) = self.get_tab_session(tab.id) {
            tab.session = session;
        }
        self.set_tab(&tab);
        if tab.pinned {
            tab.session.group_id = None;
        }
        tab
    }

    /// Removes stored values of a tab
    pub async fn forget_tab_values(&self, tab_id: TabId) {
        if let Err(e) = self.values.remove_tab_session(tab_id).await {
            tracing::debug!(tab_id = %tab_id, error = %e, "Failed to remove tab session");
        }
    }

    /// Removes stored values of a window
    pub async fn forget_window_values(&self, window_id: WindowId) {
        if let Err(e) = self.values.remove_window_group(window_id).await {
            tracing::debug!(window_id = %window_id, error = %e, "Failed to remove window session");
        }
    }

    /// Drops every cached entry
    pub fn clear(&self) {
        *self.lock() = CacheState::default();
    }
}

impl std::fmt::Debug for SessionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("SessionCache")
            .field("tabs", &state.tabs.len())
            .field("windows", &state.windows.len())
            .field("loaded_groups", &state.group_windows.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::InMemoryHost;

    fn cache() -> (Arc<InMemoryHost>, SessionCache) {
        let host = Arc::new(InMemoryHost::new());
        let cache = SessionCache::new(Arc::clone(&host) as Arc<dyn SessionValuesPort>);
        (host, cache)
    }

    fn tab(id: u32, window: u32) -> Tab {
        Tab::new(TabId(id), WindowId(window), format!("https://site{id}.test"))
    }

    #[test]
    fn unknown_ids_return_none() {
        let (_, cache) = cache();
        assert_eq!(cache.get_window_group(WindowId(1)), None);
        assert_eq!(cache.get_window_id(GroupId(1)), None);
        assert_eq!(cache.get_tab_session(TabId(1)), None);
        assert!(!cache.set_tab_group(TabId(1), Some(GroupId(1))));
    }

    #[test]
    fn set_window_group_moves_mapping() {
        let (_, cache) = cache();
        cache.set_window_group(WindowId(1), GroupId(5));
        cache.set_window_group(WindowId(2), GroupId(5));

        assert_eq!(cache.get_window_id(GroupId(5)), Some(WindowId(2)));
        assert_eq!(cache.get_window_group(WindowId(1)), None);
        assert_eq!(cache.loaded_groups(), vec![(WindowId(2), GroupId(5))]);
    }

    #[test]
    fn replacing_window_group_updates_reverse_index() {
        let (_, cache) = cache();
        cache.set_window_group(WindowId(1), GroupId(1));
        cache.set_window_group(WindowId(1), GroupId(2));

        assert_eq!(cache.get_window_id(GroupId(1)), None);
        assert_eq!(cache.get_window_id(GroupId(2)), Some(WindowId(1)));

        cache.remove_window(WindowId(1));
        assert_eq!(cache.get_window_id(GroupId(2)), None);
    }

    #[test]
    fn pinned_tab_never_keeps_group() {
        let (_, cache) = cache();
        let mut t = tab(1, 1);
        cache.set_tab(&t);
        assert!(cache.set_tab_group(t.id, Some(GroupId(3))));

        t.pinned = true;
        cache.set_tab(&t);
        assert_eq!(cache.tab_group(t.id), None);
        assert!(!cache.set_tab_group(t.id, Some(GroupId(3))));
        assert_eq!(cache.tab_group(t.id), None);
    }

    #[test]
    fn set_tab_keeps_cached_session() {
        let (_, cache) = cache();
        let t = tab(1, 1);
        cache.set_tab(&t);
        cache.set_tab_group(t.id, Some(GroupId(2)));
        cache.set_tab_fav_icon(t.id, "/icons/x.svg".into());

        let mut moved = t.clone();
        moved.window_id = WindowId(9);
        cache.set_tab(&moved);

        let session = cache.get_tab_session(t.id).unwrap();
        assert_eq!(session.group_id, Some(GroupId(2)));
        assert_eq!(session.fav_icon_url.as_deref(), Some("/icons/x.svg"));
        assert_eq!(cache.tab(t.id).unwrap().window_id, WindowId(9));
    }

    #[test]
    fn removed_tabs_for_create_returns_grouped_only() {
        let (_, cache) = cache();
        for id in 1..=3 {
            cache.set_tab(&tab(id, 1));
        }
        cache.set_tab_group(TabId(1), Some(GroupId(1)));
        cache.set_tab_group(TabId(3), Some(GroupId(1)));

        let tabs = cache.take_removed_tabs_for_create(&[TabId(1), TabId(2), TabId(3)]);
        let ids: Vec<_> = tabs.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![TabId(1), TabId(3)]);
        assert!(cache.tab_ids().is_empty());
    }

    #[tokio::test]
    async fn load_sessions_from_stored_values() {
        let (host, cache) = cache();
        host.set_tab_session(
            TabId(4),
            TabSession {
                group_id: Some(GroupId(8)),
                ..TabSession::default()
            },
        )
        .await
        .unwrap();
        host.set_window_group(WindowId(2), GroupId(8)).await.unwrap();

        let t = cache.load_tab_session(tab(4, 2)).await;
        assert_eq!(t.session.group_id, Some(GroupId(8)));
        assert_eq!(cache.tab_group(TabId(4)), Some(GroupId(8)));

        let w = cache.load_window_session(Window::new(WindowId(2))).await;
        assert_eq!(w.session.group_id, Some(GroupId(8)));
        assert_eq!(cache.get_window_id(GroupId(8)), Some(WindowId(2)));

        let fresh = cache.load_window_session(Window::new(WindowId(3))).await;
        assert_eq!(fresh.session.group_id, None);
    }

    #[tokio::test]
    async fn mutations_are_persisted() {
        let (host, cache) = cache();
        cache.set_tab(&tab(1, 1));
        cache.set_tab_group(TabId(1), Some(GroupId(6)));
        cache.set_window_group(WindowId(1), GroupId(6));
        host.settle().await;

        let stored = host.get_tab_session(TabId(1)).await.unwrap().unwrap();
        assert_eq!(stored.group_id, Some(GroupId(6)));
        assert_eq!(
            host.get_window_group(WindowId(1)).await.unwrap(),
            Some(GroupId(6))
        );
    }
}
