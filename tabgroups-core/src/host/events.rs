//! Host event boundary
//!
//! The host delivers lifecycle events to registered listeners. Adding a
//! listener returns a [`Subscription`]; dropping it unsubscribes. The
//! [`EventGate`] owns the engine's subscription and lets bulk tab
//! manipulation pause delivery entirely, not merely ignore it.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;

use crate::models::{ChangeInfo, Tab, TabId, Window, WindowId};

/// Lifecycle event emitted by the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    /// A tab was created
    TabCreated(Tab),
    /// A tab changed
    TabUpdated {
        /// Tab id
        tab_id: TabId,
        /// Changed properties
        change: ChangeInfo,
        /// Tab state after the change
        tab: Tab,
    },
    /// A tab was closed
    TabRemoved {
        /// Tab id
        tab_id: TabId,
        /// Window the tab was in
        window_id: WindowId,
        /// The tab closed because its window closed
        is_window_closing: bool,
    },
    /// A tab moved within its window
    TabMoved {
        /// Tab id
        tab_id: TabId,
        /// Window id
        window_id: WindowId,
        /// Old index
        from_index: u32,
        /// New index
        to_index: u32,
    },
    /// A tab was attached to a window
    TabAttached {
        /// Tab id
        tab_id: TabId,
        /// New window
        new_window_id: WindowId,
        /// New index
        new_position: u32,
    },
    /// A tab was detached from a window
    TabDetached {
        /// Tab id
        tab_id: TabId,
        /// Old window
        old_window_id: WindowId,
    },
    /// The active tab of a window changed
    TabActivated {
        /// Newly active tab
        tab_id: TabId,
        /// Previously active tab
        previous_tab_id: Option<TabId>,
        /// Window id
        window_id: WindowId,
    },
    /// A window was opened
    WindowCreated(Window),
    /// Focus moved to a window, `None` when no browser window has focus
    WindowFocusChanged(Option<WindowId>),
    /// A window was closed
    WindowRemoved(WindowId),
}

impl HostEvent {
    /// Short name for traces
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::TabCreated(_) => "tab-created",
            Self::TabUpdated { .. } => "tab-updated",
            Self::TabRemoved { .. } => "tab-removed",
            Self::TabMoved { .. } => "tab-moved",
            Self::TabAttached { .. } => "tab-attached",
            Self::TabDetached { .. } => "tab-detached",
            Self::TabActivated { .. } => "tab-activated",
            Self::WindowCreated(_) => "window-created",
            Self::WindowFocusChanged(_) => "window-focus-changed",
            Self::WindowRemoved(_) => "window-removed",
        }
    }
}

/// Top-level navigation about to start in a tab
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationRequest {
    /// Navigating tab
    pub tab_id: TabId,
    /// Target url
    pub url: String,
    /// Url of the page that started the navigation
    pub origin_url: Option<String>,
}

/// Answer of the blocking pre-navigation hook
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NavigationVerdict {
    /// Let the navigation proceed
    #[default]
    Allow,
    /// Cancel the navigation
    Cancel,
}

/// Receiver of host events
#[async_trait]
pub trait HostEventListener: Send + Sync {
    /// Handles a lifecycle event; must tolerate stale data
    async fn on_event(&self, event: HostEvent);

    /// Blocking pre-navigation hook
    async fn on_before_request(&self, request: NavigationRequest) -> NavigationVerdict;
}

/// Producer of host events
pub trait HostEventSource: Send + Sync {
    /// Registers a listener until the returned subscription is dropped
    fn add_listener(&self, listener: Arc<dyn HostEventListener>) -> Subscription;
}

/// Registration handle; unsubscribes on drop
#[must_use = "dropping a subscription unsubscribes immediately"]
pub struct Subscription {
    unsubscribe: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Creates a subscription that runs `unsubscribe` when released
    pub fn new(unsubscribe: impl FnOnce() + Send + 'static) -> Self {
        Self {
            unsubscribe: Some(Box::new(unsubscribe)),
        }
    }

    /// Unsubscribes now
    pub fn cancel(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.unsubscribe.is_some())
            .finish()
    }
}

#[derive(Default)]
struct GateState {
    listener: Option<Arc<dyn HostEventListener>>,
    armed: bool,
    pause_depth: usize,
    subscription: Option<Subscription>,
}

/// Owner of the engine's event subscription
///
/// The gate is subscribed while it is armed and no pause is held. Pauses
/// nest: overlapping bulk operations in different windows keep the gate
/// unsubscribed until the last one finishes.
pub struct EventGate {
    source: Arc<dyn HostEventSource>,
    state: Mutex<GateState>,
}

impl EventGate {
    /// Creates a disarmed gate over an event source
    #[must_use]
    pub fn new(source: Arc<dyn HostEventSource>) -> Self {
        Self {
            source,
            state: Mutex::new(GateState::default()),
        }
    }

    /// Sets the listener that receives events once armed
    pub fn attach(&self, listener: Arc<dyn HostEventListener>) {
        let mut state = self.lock();
        state.listener = Some(listener);
        state.subscription = None;
        self.sync(&mut state);
    }

    /// Drops the listener and its subscription
    pub fn detach(&self) {
        let mut state = self.lock();
        state.armed = false;
        state.listener = None;
        self.sync(&mut state);
    }

    /// Starts event delivery
    pub fn arm(&self) {
        let mut state = self.lock();
        state.armed = true;
        self.sync(&mut state);
    }

    /// Stops event delivery until [`arm`](Self::arm) is called again
    pub fn disarm(&self) {
        let mut state = self.lock();
        state.armed = false;
        self.sync(&mut state);
    }

    /// Re-subscribes after an unexpected failure if nothing holds a pause
    pub fn rearm(&self) {
        let mut state = self.lock();
        if state.pause_depth > 0 {
            tracing::warn!(depth = state.pause_depth, "Event gate rearm while paused");
        }
        state.armed = true;
        self.sync(&mut state);
    }

    /// Unsubscribes until the returned guard is dropped
    pub fn pause(&self) -> PauseGuard<'_> {
        let mut state = self.lock();
        state.pause_depth += 1;
        self.sync(&mut state);
        PauseGuard { gate: self }
    }

    /// Returns true while events are delivered
    #[must_use]
    pub fn is_listening(&self) -> bool {
        self.lock().subscription.is_some()
    }

    /// Returns true if the gate was armed
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.lock().armed
    }

    fn resume(&self) {
        let mut state = self.lock();
        state.pause_depth = state.pause_depth.saturating_sub(1);
        self.sync(&mut state);
    }

    fn sync(&self, state: &mut GateState) {
        let should_listen = state.armed && state.pause_depth == 0 && state.listener.is_some();

        if !should_listen {
            if let Some(subscription) = state.subscription.take() {
                subscription.cancel();
            }
            return;
        }

        if state.subscription.is_none()
            && let Some(listener) = &state.listener
        {
            state.subscription = Some(self.source.add_listener(Arc::clone(listener)));
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Pause held by a bulk tab operation; resumes delivery on drop
#[must_use = "events resume as soon as the guard is dropped"]
pub struct PauseGuard<'a> {
    gate: &'a EventGate,
}

impl Drop for PauseGuard<'_> {
    fn drop(&mut self) {
        self.gate.resume();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[derive(Default)]
    struct CountingSource {
        active: Arc<AtomicUsize>,
        total: AtomicUsize,
    }

    impl HostEventSource for CountingSource {
        fn add_listener(&self, _listener: Arc<dyn HostEventListener>) -> Subscription {
            self.active.fetch_add(1, Ordering::SeqCst);
            self.total.fetch_add(1, Ordering::SeqCst);
            let active = Arc::clone(&self.active);
            Subscription::new(move || {
                active.fetch_sub(1, Ordering::SeqCst);
            })
        }
    }

    struct Noop;

    #[async_trait]
    impl HostEventListener for Noop {
        async fn on_event(&self, _event: HostEvent) {}

        async fn on_before_request(&self, _request: NavigationRequest) -> NavigationVerdict {
            NavigationVerdict::Allow
        }
    }

    fn gate() -> (Arc<CountingSource>, EventGate) {
        let source = Arc::new(CountingSource::default());
        let gate = EventGate::new(Arc::clone(&source) as Arc<dyn HostEventSource>);
        gate.attach(Arc::new(Noop));
        (source, gate)
    }

    #[test]
    fn subscription_runs_once() {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        let sub = Subscription::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        sub.cancel();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn gate_listens_only_when_armed() {
        let (source, gate) = gate();
        assert!(!gate.is_listening());

        gate.arm();
        assert!(gate.is_listening());
        assert_eq!(source.active.load(Ordering::SeqCst), 1);

        gate.disarm();
        assert!(!gate.is_listening());
        assert_eq!(source.active.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn nested_pauses_resume_after_last_guard() {
        let (source, gate) = gate();
        gate.arm();

        let first = gate.pause();
        let second = gate.pause();
        assert_eq!(source.active.load(Ordering::SeqCst), 0);

        drop(first);
        assert!(!gate.is_listening());

        drop(second);
        assert!(gate.is_listening());
        assert_eq!(source.total.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn pause_on_disarmed_gate_stays_silent() {
        let (source, gate) = gate();
        {
            let _guard = gate.pause();
        }
        assert!(!gate.is_listening());
        assert_eq!(source.total.load(Ordering::SeqCst), 0);
    }
}
