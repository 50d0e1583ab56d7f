//! Host event routing
//!
//! [`EventRouter`] is the engine's host event listener. Every handler
//! tolerates stale data and re-entry: the engine's own tab commands come
//! back as events, and those are either paused at the [`EventGate`] or
//! filtered through the exclude set before anything touches the cache.
//!
//! Exclusion and ignored-window checks run before a handler's first await,
//! so a guard released right after the command that produced the event
//! still covers it.
//!
//! [`EventGate`]: crate::host::EventGate

mod navigation;
mod tabs;
mod windows;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tracing::Instrument;

use crate::apply::GroupApplier;
use crate::coalesce::CoalescingBatch;
use crate::error::Result;
use crate::groups::{GroupManager, GroupStore, GroupUpdates};
use crate::host::{HostEvent, HostEventListener, NavigationRequest, NavigationVerdict};
use crate::models::{GroupId, TabId, WindowId};
use crate::state::SessionState;
use crate::tabs::TabOps;
use crate::toolbar::Toolbar;
use crate::tracing::span_names;

/// Components the router drives
#[derive(Clone)]
pub struct RouterDeps {
    /// Shared state
    pub state: Arc<SessionState>,
    /// Tab operations
    pub tabs: Arc<TabOps>,
    /// Group persistence
    pub store: Arc<GroupStore>,
    /// Group operations
    pub manager: Arc<GroupManager>,
    /// Group switching
    pub applier: Arc<GroupApplier>,
    /// Debounced group refreshes
    pub updates: Arc<GroupUpdates>,
    /// Toolbar and menus
    pub toolbar: Arc<Toolbar>,
}

/// Listener reconciling host events with the session
pub struct EventRouter {
    state: Arc<SessionState>,
    tabs: Arc<TabOps>,
    store: Arc<GroupStore>,
    manager: Arc<GroupManager>,
    applier: Arc<GroupApplier>,
    updates: Arc<GroupUpdates>,
    toolbar: Arc<Toolbar>,
    lazy_moves: CoalescingBatch<GroupId, TabId>,
    closing_tabs: Mutex<Vec<TabId>>,
    last_focused: Mutex<Option<WindowId>>,
}

impl EventRouter {
    /// Creates the router and its lazy-move worker
    ///
    /// Must be called within a Tokio runtime.
    #[must_use]
    pub fn new(deps: RouterDeps) -> Self {
        let quiet = Duration::from_millis(deps.state.settings.timing.lazy_move_ms);
        let lazy_moves = Self::spawn_lazy_moves(quiet, &deps);

        Self {
            state: deps.state,
            tabs: deps.tabs,
            store: deps.store,
            manager: deps.manager,
            applier: deps.applier,
            updates: deps.updates,
            toolbar: deps.toolbar,
            lazy_moves,
            closing_tabs: Mutex::new(Vec::new()),
            last_focused: Mutex::new(None),
        }
    }

    // Tabs caught by another group are moved together once navigation
    // bursts go quiet
    fn spawn_lazy_moves(quiet: Duration, deps: &RouterDeps) -> CoalescingBatch<GroupId, TabId> {
        let state = Arc::clone(&deps.state);
        let store = Arc::clone(&deps.store);
        let manager = Arc::clone(&deps.manager);

        CoalescingBatch::spawn(quiet, move |group_id: GroupId, tab_ids: Vec<TabId>| {
            let state = Arc::clone(&state);
            let store = Arc::clone(&store);
            let manager = Arc::clone(&manager);
            async move {
                let show_after_move = match store.load(group_id).await {
                    Ok(group) => group.show_tab_after_moving_it_into_this_group,
                    Err(e) => {
                        tracing::debug!(group_id = %group_id, error = %e, "Lazy move target vanished");
                        return;
                    }
                };
                tracing::debug!(group_id = %group_id, count = tab_ids.len(), "Moving caught tabs");
                if let Err(e) = manager.move_tabs(&tab_ids, group_id, show_after_move).await {
                    state.reporter.report("move caught tabs", &e).await;
                }
            }
        })
    }

    async fn dispatch(&self, event: HostEvent) -> Result<()> {
        match event {
            HostEvent::TabCreated(tab) => {
                self.on_tab_created(&tab);
                Ok(())
            }
            HostEvent::TabUpdated {
                tab_id,
                change,
                tab,
            } => self.on_tab_updated(tab_id, change, tab).await,
            HostEvent::TabRemoved {
                tab_id,
                window_id,
                is_window_closing,
            } => {
                self.on_tab_removed(tab_id, window_id, is_window_closing);
                Ok(())
            }
            HostEvent::TabMoved { tab_id, .. } => {
                self.on_tab_moved(tab_id);
                Ok(())
            }
            HostEvent::TabAttached {
                tab_id,
                new_window_id,
                ..
            } => {
                self.on_tab_attached(tab_id, new_window_id);
                Ok(())
            }
            HostEvent::TabDetached {
                tab_id,
                old_window_id,
            } => {
                tracing::debug!(tab_id = %tab_id, window_id = %old_window_id, "Tab detached");
                Ok(())
            }
            HostEvent::TabActivated {
                tab_id,
                previous_tab_id,
                ..
            } => {
                self.on_tab_activated(tab_id, previous_tab_id);
                Ok(())
            }
            HostEvent::WindowCreated(window) => self.on_window_created(window).await,
            HostEvent::WindowFocusChanged(window_id) => self.on_window_focus_changed(window_id).await,
            HostEvent::WindowRemoved(window_id) => self.on_window_removed(window_id).await,
        }
    }

    fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
        mutex.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl HostEventListener for EventRouter {
    async fn on_event(&self, event: HostEvent) {
        let name = event.name();
        let span = tracing::debug_span!(span_names::HOST_EVENT, event = name);
        if let Err(e) = self.dispatch(event).instrument(span).await {
            self.state.reporter.report(name, &e).await;
        }
    }

    async fn on_before_request(&self, request: NavigationRequest) -> NavigationVerdict {
        let tab_id = request.tab_id;
        let span = tracing::debug_span!(span_names::NAVIGATION, tab_id = %tab_id);
        match self.intercept(request).instrument(span).await {
            Ok(verdict) => verdict,
            Err(e) => {
                self.state.reporter.report("navigation", &e).await;
                NavigationVerdict::Allow
            }
        }
    }
}

impl std::fmt::Debug for EventRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventRouter")
            .field("closing_tabs", &Self::lock(&self.closing_tabs).len())
            .finish_non_exhaustive()
    }
}
