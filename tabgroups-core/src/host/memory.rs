//! In-memory browser host
//!
//! Implements every host port over plain data structures and emits the
//! same lifecycle events a browser would. Used by the test suites and by
//! offline simulation.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{HostError, HostResult};
use crate::models::{
    ChangeInfo, Container, ContainerDetails, DEFAULT_COOKIE_STORE_ID, GroupId, SharingState, Tab,
    TabId, TabSession, TabStatus, Window, WindowId, WindowKind,
};

use super::events::{
    HostEvent, HostEventListener, HostEventSource, NavigationRequest, NavigationVerdict,
    Subscription,
};
use super::ports::{
    ContainerPort, CreateTabProps, CreateWindowProps, MenuItem, Notification, NotificationPort,
    SessionValuesPort, TabPort, TabQuery, TabUpdate, ToolbarPort, WindowPort,
};

/// Command issued to the host, recorded for assertions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCall {
    /// `tabs.create`
    CreateTab(TabId),
    /// `tabs.move`
    MoveTabs {
        /// Moved tabs
        ids: Vec<TabId>,
        /// Target window
        window_id: WindowId,
    },
    /// `tabs.show`
    ShowTabs(Vec<TabId>),
    /// `tabs.hide`
    HideTabs(Vec<TabId>),
    /// `tabs.update`
    UpdateTab(TabId),
    /// `tabs.discard`
    DiscardTabs(Vec<TabId>),
    /// `tabs.reload`
    ReloadTab(TabId),
    /// `tabs.remove`
    RemoveTabs(Vec<TabId>),
    /// `windows.create`
    CreateWindow(WindowId),
    /// `windows.update {focused}`
    FocusWindow(WindowId),
}

#[derive(Default)]
struct HostState {
    tabs: BTreeMap<TabId, Tab>,
    windows: BTreeMap<WindowId, Window>,
    next_tab_id: u32,
    next_window_id: u32,
    focus_order: Vec<WindowId>,
    tab_values: HashMap<TabId, TabSession>,
    window_values: HashMap<WindowId, GroupId>,
    containers: Vec<Container>,
    next_container_id: u32,
    notifications: Vec<Notification>,
    toolbar_titles: HashMap<Option<WindowId>, String>,
    toolbar_icons: HashMap<Option<WindowId>, String>,
    toolbar_enabled: bool,
    menus: Vec<MenuItem>,
    title_prefaces: HashMap<WindowId, String>,
    calls: Vec<HostCall>,
    tick: u64,
}

impl HostState {
    fn window_tabs(&self, window_id: WindowId) -> Vec<TabId> {
        let mut tabs: Vec<&Tab> = self
            .tabs
            .values()
            .filter(|t| t.window_id == window_id)
            .collect();
        tabs.sort_by_key(|t| t.index);
        tabs.into_iter().map(|t| t.id).collect()
    }

    fn reindex(&mut self, order: &[TabId]) {
        for (index, id) in order.iter().enumerate() {
            if let Some(tab) = self.tabs.get_mut(id) {
                tab.index = index as u32;
            }
        }
    }

    fn last_focused(&self) -> Option<WindowId> {
        self.focus_order
            .iter()
            .rev()
            .find(|id| self.windows.contains_key(id))
            .copied()
            .or_else(|| self.windows.keys().next().copied())
    }

    fn active_tab(&self, window_id: WindowId) -> Option<TabId> {
        self.tabs
            .values()
            .find(|t| t.window_id == window_id && t.active)
            .map(|t| t.id)
    }

    fn tab(&self, id: TabId) -> HostResult<Tab> {
        self.tabs
            .get(&id)
            .map(host_view)
            .ok_or(HostError::TabNotFound(id))
    }

    fn touch(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }
}

// Host objects never carry the extension's session overlay
fn host_view(tab: &Tab) -> Tab {
    Tab {
        session: TabSession::default(),
        ..tab.clone()
    }
}

/// Simulated browser implementing every host port
pub struct InMemoryHost {
    state: Mutex<HostState>,
    listeners: Arc<Mutex<Vec<(u64, Arc<dyn HostEventListener>)>>>,
    next_listener_id: AtomicU64,
    pending: Arc<AtomicUsize>,
    latency: Mutex<Option<Duration>>,
}

impl Default for InMemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryHost {
    /// Creates a host without windows
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(HostState {
                next_tab_id: 1,
                next_window_id: 1,
                next_container_id: 1,
                toolbar_enabled: true,
                ..HostState::default()
            }),
            listeners: Arc::new(Mutex::new(Vec::new())),
            next_listener_id: AtomicU64::new(1),
            pending: Arc::new(AtomicUsize::new(0)),
            latency: Mutex::new(None),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HostState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Delays every tab and window command by `latency`
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.lock().unwrap_or_else(PoisonError::into_inner) = latency;
    }

    async fn delay(&self) {
        let latency = *self.latency.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        } else {
            tokio::task::yield_now().await;
        }
    }

    fn current_listeners(&self) -> Vec<Arc<dyn HostEventListener>> {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect()
    }

    fn emit(&self, events: Vec<HostEvent>) {
        if events.is_empty() {
            return;
        }
        let listeners = self.current_listeners();
        if listeners.is_empty() {
            return;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };

        for event in events {
            for listener in &listeners {
                let listener = Arc::clone(listener);
                let event = event.clone();
                let pending = Arc::clone(&self.pending);
                pending.fetch_add(1, Ordering::SeqCst);
                handle.spawn(async move {
                    listener.on_event(event).await;
                    pending.fetch_sub(1, Ordering::SeqCst);
                });
            }
        }
    }

    // Lets freshly spawned handlers start before the command resolves, the
    // way the browser delivers events ahead of the command's reply
    async fn publish(&self, events: Vec<HostEvent>) {
        let dispatched = !events.is_empty();
        self.emit(events);
        if dispatched {
            tokio::task::yield_now().await;
        }
    }

    /// Waits until every dispatched event has been handled and the
    /// handlers' follow-up work went quiet
    pub async fn settle(&self) {
        let mut quiet = 0;
        for _ in 0..10_000 {
            tokio::time::sleep(Duration::from_millis(1)).await;
            if self.pending.load(Ordering::SeqCst) == 0 {
                quiet += 1;
                if quiet >= 5 {
                    return;
                }
            } else {
                quiet = 0;
            }
        }
        tracing::warn!("In-memory host did not settle");
    }

    // Simulation helpers

    /// Delivers an event again, the way the browser sometimes repeats one
    pub async fn redeliver(&self, event: HostEvent) {
        self.publish(vec![event]).await;
    }

    /// Opens a focused normal window with one new tab page
    pub fn open_window(&self) -> WindowId {
        let (window, events) = self.insert_window(CreateWindowProps {
            url: None,
            focused: true,
        });
        self.emit(events);
        window.id
    }

    fn insert_window(&self, props: CreateWindowProps) -> (Window, Vec<HostEvent>) {
        let mut state = self.lock();
        let id = WindowId(state.next_window_id);
        state.next_window_id += 1;
        let mut window = Window::new(id);
        window.focused = props.focused;
        state.windows.insert(id, window.clone());
        if props.focused {
            state.focus_order.push(id);
        }

        let tab_id = TabId(state.next_tab_id);
        state.next_tab_id += 1;
        let mut tab = Tab::new(tab_id, id, props.url.unwrap_or_else(|| "about:newtab".into()));
        tab.active = true;
        state.tabs.insert(tab_id, tab.clone());
        state.calls.push(HostCall::CreateWindow(id));

        let mut events = vec![HostEvent::WindowCreated(window.clone()), HostEvent::TabCreated(tab)];
        if props.focused {
            events.push(HostEvent::WindowFocusChanged(Some(id)));
        }
        (window, events)
    }

    /// Opens a popup window; its tabs must be ignored by the engine
    pub fn open_popup(&self) -> WindowId {
        let (window, tab) = {
            let mut state = self.lock();
            let id = WindowId(state.next_window_id);
            state.next_window_id += 1;
            let mut window = Window::new(id);
            window.kind = WindowKind::Popup;
            state.windows.insert(id, window.clone());

            let tab_id = TabId(state.next_tab_id);
            state.next_tab_id += 1;
            let mut tab = Tab::new(tab_id, id, "about:blank");
            tab.active = true;
            state.tabs.insert(tab_id, tab.clone());
            (window, tab)
        };
        let id = window.id;
        self.emit(vec![HostEvent::WindowCreated(window), HostEvent::TabCreated(tab)]);
        id
    }

    /// Opens a tab the way a user would
    ///
    /// # Errors
    ///
    /// Fails if the window does not exist.
    pub async fn open_tab(&self, window_id: WindowId, url: &str) -> HostResult<Tab> {
        let props = CreateTabProps {
            url: Some(url.to_string()),
            window_id: Some(window_id),
            ..CreateTabProps::default()
        };
        TabPort::create(self, props).await
    }

    /// Inserts a tab without emitting events, as if it existed at startup
    pub fn seed_tab(&self, window_id: WindowId, url: &str) -> Tab {
        let mut state = self.lock();
        let id = TabId(state.next_tab_id);
        state.next_tab_id += 1;
        let mut tab = Tab::new(id, window_id, url);
        tab.index = state.window_tabs(window_id).len() as u32;
        if state.active_tab(window_id).is_none() {
            tab.active = true;
        }
        state.tabs.insert(id, tab.clone());
        tab
    }

    /// Inserts a window without emitting events, as if it existed at startup
    pub fn seed_window(&self) -> WindowId {
        let mut state = self.lock();
        let id = WindowId(state.next_window_id);
        state.next_window_id += 1;
        state.windows.insert(id, Window::new(id));
        state.focus_order.push(id);
        id
    }

    /// Runs the blocking pre-navigation hook, then navigates
    pub async fn navigate(
        &self,
        tab_id: TabId,
        url: &str,
        origin_url: Option<&str>,
    ) -> NavigationVerdict {
        let listeners = self.current_listeners();

        for listener in listeners {
            let request = NavigationRequest {
                tab_id,
                url: url.to_string(),
                origin_url: origin_url.map(String::from),
            };
            if listener.on_before_request(request).await == NavigationVerdict::Cancel {
                return NavigationVerdict::Cancel;
            }
        }

        let events = {
            let mut state = self.lock();
            let Some(tab) = state.tabs.get_mut(&tab_id) else {
                return NavigationVerdict::Allow;
            };
            tab.url = url.to_string();
            tab.status = TabStatus::Complete;
            let snapshot = host_view(tab);
            vec![HostEvent::TabUpdated {
                tab_id,
                change: ChangeInfo {
                    url: Some(url.to_string()),
                    status: Some(TabStatus::Complete),
                    ..ChangeInfo::default()
                },
                tab: snapshot,
            }]
        };
        self.publish(events).await;
        NavigationVerdict::Allow
    }

    /// Closes a window and all of its tabs
    pub fn close_window(&self, window_id: WindowId) {
        let events = {
            let mut state = self.lock();
            if state.windows.remove(&window_id).is_none() {
                return;
            }
            let ids = state.window_tabs(window_id);
            let mut events: Vec<_> = ids
                .iter()
                .map(|&tab_id| HostEvent::TabRemoved {
                    tab_id,
                    window_id,
                    is_window_closing: true,
                })
                .collect();
            for id in &ids {
                state.tabs.remove(id);
                state.tab_values.remove(id);
            }
            events.push(HostEvent::WindowRemoved(window_id));
            events
        };
        self.emit(events);
    }

    /// Sets media sharing state on a tab
    pub fn set_sharing(&self, tab_id: TabId, sharing: SharingState) {
        if let Some(tab) = self.lock().tabs.get_mut(&tab_id) {
            tab.sharing_state = sharing;
        }
    }

    /// Every tab, ordered by window then index
    #[must_use]
    pub fn tabs(&self) -> Vec<Tab> {
        let state = self.lock();
        let mut tabs: Vec<Tab> = state.tabs.values().map(host_view).collect();
        tabs.sort_by_key(|t| (t.window_id, t.index));
        tabs
    }

    /// One tab
    #[must_use]
    pub fn tab(&self, tab_id: TabId) -> Option<Tab> {
        self.lock().tab(tab_id).ok()
    }

    /// Visible tabs of a window, in order
    #[must_use]
    pub fn visible_tabs(&self, window_id: WindowId) -> Vec<TabId> {
        self.tabs()
            .into_iter()
            .filter(|t| t.window_id == window_id && !t.hidden)
            .map(|t| t.id)
            .collect()
    }

    /// Commands issued so far
    #[must_use]
    pub fn calls(&self) -> Vec<HostCall> {
        self.lock().calls.clone()
    }

    /// Forgets recorded commands
    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Notifications shown so far
    #[must_use]
    pub fn notifications(&self) -> Vec<Notification> {
        self.lock().notifications.clone()
    }

    /// Current context menu entries
    #[must_use]
    pub fn menus(&self) -> Vec<MenuItem> {
        self.lock().menus.clone()
    }

    /// Toolbar title of a window
    #[must_use]
    pub fn toolbar_title(&self, window_id: Option<WindowId>) -> Option<String> {
        self.lock().toolbar_titles.get(&window_id).cloned()
    }

    /// Window title preface
    #[must_use]
    pub fn title_preface(&self, window_id: WindowId) -> Option<String> {
        self.lock().title_prefaces.get(&window_id).cloned()
    }

    /// Number of registered listeners
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Adds a container directly
    pub fn add_container(&self, name: &str) -> Container {
        let mut state = self.lock();
        let container = Container {
            cookie_store_id: format!("firefox-container-{}", state.next_container_id),
            name: name.to_string(),
            color: "blue".to_string(),
            icon: "fingerprint".to_string(),
        };
        state.next_container_id += 1;
        state.containers.push(container.clone());
        container
    }

    /// Ids of existing containers
    #[must_use]
    pub fn container_ids(&self) -> Vec<String> {
        self.lock()
            .containers
            .iter()
            .map(|c| c.cookie_store_id.clone())
            .collect()
    }
}

#[async_trait]
impl TabPort for InMemoryHost {
    async fn query(&self, query: TabQuery) -> HostResult<Vec<Tab>> {
        self.delay().await;
        Ok(self
            .tabs()
            .into_iter()
            .filter(|tab| query.matches(tab))
            .collect())
    }

    async fn get(&self, id: TabId) -> HostResult<Tab> {
        self.delay().await;
        self.lock().tab(id)
    }

    async fn create(&self, props: CreateTabProps) -> HostResult<Tab> {
        self.delay().await;
        let (tab, events) = {
            let mut state = self.lock();
            let window_id = match props.window_id {
                Some(id) if state.windows.contains_key(&id) => id,
                Some(id) => return Err(HostError::WindowNotFound(id)),
                None => state.last_focused().ok_or(HostError::Rejected {
                    command: "tabs.create",
                    reason: "no window".to_string(),
                })?,
            };

            let cookie_store_id = props
                .cookie_store_id
                .unwrap_or_else(|| DEFAULT_COOKIE_STORE_ID.to_string());
            if cookie_store_id != DEFAULT_COOKIE_STORE_ID
                && !state
                    .containers
                    .iter()
                    .any(|c| c.cookie_store_id == cookie_store_id)
            {
                return Err(HostError::ContainerNotFound(cookie_store_id));
            }

            let id = TabId(state.next_tab_id);
            state.next_tab_id += 1;
            let tick = state.touch();

            let mut tab = Tab::new(id, window_id, props.url.unwrap_or_else(|| "about:newtab".into()));
            tab.title = props.title.unwrap_or_default();
            tab.pinned = props.pinned;
            tab.discarded = props.discarded;
            tab.cookie_store_id = cookie_store_id;
            tab.last_accessed = tick;

            let mut order = state.window_tabs(window_id);
            let index = props
                .index
                .map_or(order.len(), |i| (i as usize).min(order.len()));
            order.insert(index, id);
            state.tabs.insert(id, tab.clone());
            state.reindex(&order);

            let mut events = Vec::new();
            let previous = state.active_tab(window_id);
            let activate = props.active || previous.is_none();
            if activate {
                if let Some(prev) = previous
                    && let Some(t) = state.tabs.get_mut(&prev)
                {
                    t.active = false;
                }
                if let Some(t) = state.tabs.get_mut(&id) {
                    t.active = true;
                }
            }
            let created = state.tab(id)?;
            events.push(HostEvent::TabCreated(created.clone()));
            if activate {
                events.push(HostEvent::TabActivated {
                    tab_id: id,
                    previous_tab_id: previous,
                    window_id,
                });
            }
            state.calls.push(HostCall::CreateTab(id));
            (created, events)
        };
        self.publish(events).await;
        Ok(tab)
    }

    async fn move_tabs(
        &self,
        ids: &[TabId],
        window_id: WindowId,
        index: Option<u32>,
    ) -> HostResult<Vec<Tab>> {
        self.delay().await;
        let (moved, events) = {
            let mut state = self.lock();
            if !state.windows.contains_key(&window_id) {
                return Err(HostError::WindowNotFound(window_id));
            }
            let ids: Vec<TabId> = ids
                .iter()
                .copied()
                .filter(|id| state.tabs.contains_key(id))
                .collect();

            let mut events = Vec::new();
            let mut insert_at = index.map(|i| i as usize);
            for &id in &ids {
                let Some(old) = state.tabs.get(&id).cloned() else {
                    continue;
                };
                let mut source = state.window_tabs(old.window_id);
                source.retain(|t| *t != id);
                state.reindex(&source);

                let mut target = state.window_tabs(window_id);
                target.retain(|t| *t != id);
                let at = insert_at.map_or(target.len(), |i| i.min(target.len()));
                target.insert(at, id);
                insert_at = insert_at.map(|_| at + 1);

                if let Some(tab) = state.tabs.get_mut(&id) {
                    tab.window_id = window_id;
                    if old.window_id != window_id {
                        tab.active = false;
                    }
                }
                state.reindex(&target);

                if old.window_id == window_id {
                    events.push(HostEvent::TabMoved {
                        tab_id: id,
                        window_id,
                        from_index: old.index,
                        to_index: at as u32,
                    });
                } else {
                    events.push(HostEvent::TabDetached {
                        tab_id: id,
                        old_window_id: old.window_id,
                    });
                    events.push(HostEvent::TabAttached {
                        tab_id: id,
                        new_window_id: window_id,
                        new_position: at as u32,
                    });
                }
            }

            state.calls.push(HostCall::MoveTabs {
                ids: ids.clone(),
                window_id,
            });
            let moved = ids
                .iter()
                .filter_map(|id| state.tab(*id).ok())
                .collect::<Vec<_>>();
            (moved, events)
        };
        self.publish(events).await;
        Ok(moved)
    }

    async fn show(&self, ids: &[TabId]) -> HostResult<Vec<TabId>> {
        self.delay().await;
        let (shown, events) = {
            let mut state = self.lock();
            let mut shown = Vec::new();
            let mut events = Vec::new();
            for id in ids {
                let Some(tab) = state.tabs.get_mut(id) else {
                    continue;
                };
                if tab.hidden {
                    tab.hidden = false;
                    events.push(HostEvent::TabUpdated {
                        tab_id: *id,
                        change: ChangeInfo {
                            hidden: Some(false),
                            ..ChangeInfo::default()
                        },
                        tab: host_view(tab),
                    });
                }
                shown.push(*id);
            }
            state.calls.push(HostCall::ShowTabs(ids.to_vec()));
            (shown, events)
        };
        self.publish(events).await;
        Ok(shown)
    }

    async fn hide(&self, ids: &[TabId]) -> HostResult<Vec<TabId>> {
        self.delay().await;
        let (hidden, events) = {
            let mut state = self.lock();
            let mut hidden = Vec::new();
            let mut events = Vec::new();
            for id in ids {
                let Some(tab) = state.tabs.get_mut(id) else {
                    continue;
                };
                // The host refuses to hide these
                if tab.active || !tab.can_be_hidden() {
                    continue;
                }
                if !tab.hidden {
                    tab.hidden = true;
                    events.push(HostEvent::TabUpdated {
                        tab_id: *id,
                        change: ChangeInfo {
                            hidden: Some(true),
                            ..ChangeInfo::default()
                        },
                        tab: host_view(tab),
                    });
                }
                hidden.push(*id);
            }
            state.calls.push(HostCall::HideTabs(ids.to_vec()));
            (hidden, events)
        };
        self.publish(events).await;
        Ok(hidden)
    }

    async fn update(&self, id: TabId, update: TabUpdate) -> HostResult<Tab> {
        self.delay().await;
        let (tab, events) = {
            let mut state = self.lock();
            let current = state.tab(id)?;
            let mut change = ChangeInfo::default();
            let mut events = Vec::new();

            if update.active == Some(true) && !current.active {
                let previous = state.active_tab(current.window_id);
                if let Some(prev) = previous
                    && let Some(t) = state.tabs.get_mut(&prev)
                {
                    t.active = false;
                }
                let tick = state.touch();
                if let Some(t) = state.tabs.get_mut(&id) {
                    t.active = true;
                    t.hidden = false;
                    t.discarded = false;
                    t.last_accessed = tick;
                }
                events.push(HostEvent::TabActivated {
                    tab_id: id,
                    previous_tab_id: previous,
                    window_id: current.window_id,
                });
            }

            if let Some(tab) = state.tabs.get_mut(&id) {
                if let Some(muted) = update.muted
                    && tab.muted != muted
                {
                    tab.muted = muted;
                    change.muted = Some(muted);
                }
                if let Some(pinned) = update.pinned
                    && tab.pinned != pinned
                {
                    tab.pinned = pinned;
                    change.pinned = Some(pinned);
                }
                if let Some(url) = update.url {
                    tab.url.clone_from(&url);
                    change.url = Some(url);
                }
            }

            let tab = state.tab(id)?;
            if change != ChangeInfo::default() {
                events.push(HostEvent::TabUpdated {
                    tab_id: id,
                    change,
                    tab: tab.clone(),
                });
            }
            state.calls.push(HostCall::UpdateTab(id));
            (tab, events)
        };
        self.publish(events).await;
        Ok(tab)
    }

    async fn discard(&self, ids: &[TabId]) -> HostResult<()> {
        self.delay().await;
        let events = {
            let mut state = self.lock();
            let mut events = Vec::new();
            for id in ids {
                let Some(tab) = state.tabs.get_mut(id) else {
                    continue;
                };
                if tab.active || tab.discarded {
                    continue;
                }
                tab.discarded = true;
                events.push(HostEvent::TabUpdated {
                    tab_id: *id,
                    change: ChangeInfo {
                        discarded: Some(true),
                        ..ChangeInfo::default()
                    },
                    tab: host_view(tab),
                });
            }
            state.calls.push(HostCall::DiscardTabs(ids.to_vec()));
            events
        };
        self.publish(events).await;
        Ok(())
    }

    async fn reload(&self, id: TabId, _bypass_cache: bool) -> HostResult<()> {
        self.delay().await;
        let mut state = self.lock();
        let tab = state.tabs.get_mut(&id).ok_or(HostError::TabNotFound(id))?;
        tab.discarded = false;
        state.calls.push(HostCall::ReloadTab(id));
        Ok(())
    }

    async fn remove(&self, ids: &[TabId]) -> HostResult<()> {
        self.delay().await;
        let events = {
            let mut state = self.lock();
            let mut events = Vec::new();
            for id in ids {
                let Some(tab) = state.tabs.remove(id) else {
                    continue;
                };
                state.tab_values.remove(id);
                let order = state.window_tabs(tab.window_id);
                state.reindex(&order);
                if tab.active
                    && let Some(next) = order.first()
                    && let Some(t) = state.tabs.get_mut(next)
                {
                    t.active = true;
                }
                events.push(HostEvent::TabRemoved {
                    tab_id: *id,
                    window_id: tab.window_id,
                    is_window_closing: false,
                });
            }
            state.calls.push(HostCall::RemoveTabs(ids.to_vec()));
            events
        };
        self.publish(events).await;
        Ok(())
    }
}

#[async_trait]
impl WindowPort for InMemoryHost {
    async fn get_all(&self) -> HostResult<Vec<Window>> {
        self.delay().await;
        let state = self.lock();
        let focused = state.last_focused();
        Ok(state
            .windows
            .values()
            .map(|w| Window {
                focused: Some(w.id) == focused,
                ..w.clone()
            })
            .collect())
    }

    async fn get(&self, id: WindowId) -> HostResult<Window> {
        self.delay().await;
        let state = self.lock();
        let focused = state.last_focused();
        state
            .windows
            .get(&id)
            .map(|w| Window {
                focused: Some(w.id) == focused,
                ..w.clone()
            })
            .ok_or(HostError::WindowNotFound(id))
    }

    async fn get_last_focused(&self) -> HostResult<Window> {
        let id = self.lock().last_focused().ok_or(HostError::Rejected {
            command: "windows.getLastFocused",
            reason: "no windows".to_string(),
        })?;
        WindowPort::get(self, id).await
    }

    async fn create(&self, props: CreateWindowProps) -> HostResult<Window> {
        self.delay().await;
        let (window, events) = self.insert_window(props);
        self.publish(events).await;
        Ok(window)
    }

    async fn focus(&self, id: WindowId) -> HostResult<()> {
        self.delay().await;
        {
            let mut state = self.lock();
            if !state.windows.contains_key(&id) {
                return Err(HostError::WindowNotFound(id));
            }
            state.focus_order.retain(|w| *w != id);
            state.focus_order.push(id);
            state.calls.push(HostCall::FocusWindow(id));
        }
        self.publish(vec![HostEvent::WindowFocusChanged(Some(id))]).await;
        Ok(())
    }

    async fn set_title_preface(&self, id: WindowId, preface: Option<String>) -> HostResult<()> {
        let mut state = self.lock();
        match preface {
            Some(p) => state.title_prefaces.insert(id, p),
            None => state.title_prefaces.remove(&id),
        };
        Ok(())
    }
}

#[async_trait]
impl SessionValuesPort for InMemoryHost {
    async fn get_tab_session(&self, tab_id: TabId) -> HostResult<Option<TabSession>> {
        Ok(self.lock().tab_values.get(&tab_id).cloned())
    }

    async fn set_tab_session(&self, tab_id: TabId, session: TabSession) -> HostResult<()> {
        self.lock().tab_values.insert(tab_id, session);
        Ok(())
    }

    async fn remove_tab_session(&self, tab_id: TabId) -> HostResult<()> {
        self.lock().tab_values.remove(&tab_id);
        Ok(())
    }

    async fn get_window_group(&self, window_id: WindowId) -> HostResult<Option<GroupId>> {
        Ok(self.lock().window_values.get(&window_id).copied())
    }

    async fn set_window_group(&self, window_id: WindowId, group_id: GroupId) -> HostResult<()> {
        self.lock().window_values.insert(window_id, group_id);
        Ok(())
    }

    async fn remove_window_group(&self, window_id: WindowId) -> HostResult<()> {
        self.lock().window_values.remove(&window_id);
        Ok(())
    }
}

#[async_trait]
impl ContainerPort for InMemoryHost {
    async fn query(&self) -> HostResult<Vec<Container>> {
        Ok(self.lock().containers.clone())
    }

    async fn create(&self, details: ContainerDetails) -> HostResult<Container> {
        let mut state = self.lock();
        let container = Container {
            cookie_store_id: format!("firefox-container-{}", state.next_container_id),
            name: details.name,
            color: details.color,
            icon: details.icon,
        };
        state.next_container_id += 1;
        state.containers.push(container.clone());
        Ok(container)
    }

    async fn remove(&self, cookie_store_id: &str) -> HostResult<()> {
        let mut state = self.lock();
        let before = state.containers.len();
        state.containers.retain(|c| c.cookie_store_id != cookie_store_id);
        if state.containers.len() == before {
            return Err(HostError::ContainerNotFound(cookie_store_id.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl NotificationPort for InMemoryHost {
    async fn notify(&self, notification: Notification) -> HostResult<()> {
        self.lock().notifications.push(notification);
        Ok(())
    }
}

#[async_trait]
impl ToolbarPort for InMemoryHost {
    async fn set_title(&self, window_id: Option<WindowId>, title: &str) -> HostResult<()> {
        self.lock().toolbar_titles.insert(window_id, title.to_string());
        Ok(())
    }

    async fn set_icon(&self, window_id: Option<WindowId>, icon: &str) -> HostResult<()> {
        self.lock().toolbar_icons.insert(window_id, icon.to_string());
        Ok(())
    }

    async fn set_enabled(&self, enabled: bool) -> HostResult<()> {
        self.lock().toolbar_enabled = enabled;
        Ok(())
    }

    async fn remove_all_menus(&self) -> HostResult<()> {
        self.lock().menus.clear();
        Ok(())
    }

    async fn create_menu(&self, item: MenuItem) -> HostResult<()> {
        self.lock().menus.push(item);
        Ok(())
    }
}

impl HostEventSource for InMemoryHost {
    fn add_listener(&self, listener: Arc<dyn HostEventListener>) -> Subscription {
        let id = self.next_listener_id.fetch_add(1, Ordering::SeqCst);
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, listener));

        let listeners = Arc::downgrade(&self.listeners);
        Subscription::new(move || {
            if let Some(listeners) = listeners.upgrade() {
                listeners
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .retain(|(lid, _)| *lid != id);
            }
        })
    }
}
