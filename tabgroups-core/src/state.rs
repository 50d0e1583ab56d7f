//! Lifetime-scoped session state
//!
//! Everything that outlives a single operation lives in [`SessionState`]:
//! host ports, the session cache, the exclude set, the event gate, the
//! message bus and the user options. It is created once per engine and
//! shared by every component through an `Arc`.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::config::{Options, Settings};
use crate::containers::ContainerRegistry;
use crate::groups::GroupTrash;
use crate::host::{EventGate, HostPorts, Notification};
use crate::messages::{BgMessage, MessageBus};
use crate::models::{GroupId, TabId, WindowId};
use crate::report::ErrorReporter;
use crate::session::{ExcludeSet, GroupHistory, SessionCache};

/// State shared by the engine's components
pub struct SessionState {
    /// Host collaborators
    pub ports: HostPorts,
    /// Deployment settings
    pub settings: Settings,
    /// Tab and window group mapping
    pub cache: SessionCache,
    /// Tabs hidden from the event pipeline
    pub exclude: Arc<ExcludeSet>,
    /// Identity containers
    pub containers: ContainerRegistry,
    /// Event subscription owner
    pub gate: EventGate,
    /// Broadcasts to UI surfaces and partner extensions
    pub bus: MessageBus,
    /// Rolling error log
    pub reporter: ErrorReporter,
    /// Removed groups that can be restored
    pub trash: GroupTrash,
    history: Mutex<GroupHistory>,
    options: Mutex<Options>,
    ignored_windows: Mutex<HashSet<WindowId>>,
}

impl SessionState {
    /// Creates the state with default options and an empty cache
    #[must_use]
    pub fn new(ports: HostPorts, settings: Settings) -> Self {
        Self {
            cache: SessionCache::new(Arc::clone(&ports.sessions)),
            exclude: Arc::new(ExcludeSet::new()),
            containers: ContainerRegistry::new(Arc::clone(&ports.containers), Arc::clone(&ports.tabs)),
            gate: EventGate::new(Arc::clone(&ports.events)),
            bus: MessageBus::new(),
            reporter: ErrorReporter::new(
                Arc::clone(&ports.notifications),
                settings.error_log_capacity,
            ),
            trash: GroupTrash::new(),
            history: Mutex::new(GroupHistory::new(settings.history_capacity)),
            options: Mutex::new(Options::default()),
            ignored_windows: Mutex::new(HashSet::new()),
            ports,
            settings,
        }
    }

    /// Copy of the current options
    #[must_use]
    pub fn options(&self) -> Options {
        lock(&self.options).clone()
    }

    /// Replaces the options
    pub fn set_options(&self, options: Options) {
        *lock(&self.options) = options;
    }

    /// Runs `f` on the group history
    pub fn with_history<R>(&self, f: impl FnOnce(&mut GroupHistory) -> R) -> R {
        f(&mut lock(&self.history))
    }

    /// Tracks a non-normal window whose tabs are ignored
    pub fn ignore_window(&self, window_id: WindowId) {
        lock(&self.ignored_windows).insert(window_id);
    }

    /// Stops ignoring a closed window
    pub fn unignore_window(&self, window_id: WindowId) {
        lock(&self.ignored_windows).remove(&window_id);
    }

    /// Returns true for popup and other non-normal windows seen so far
    #[must_use]
    pub fn is_window_ignored(&self, window_id: WindowId) -> bool {
        lock(&self.ignored_windows).contains(&window_id)
    }

    /// Returns true if events about the tab must be skipped
    #[must_use]
    pub fn is_tab_ignored(&self, tab_id: TabId, window_id: Option<WindowId>) -> bool {
        self.exclude.contains(tab_id) || window_id.is_some_and(|w| self.is_window_ignored(w))
    }

    /// Returns true if the group is loaded in some window
    #[must_use]
    pub fn is_group_loaded(&self, group_id: GroupId) -> bool {
        self.cache.get_window_id(group_id).is_some()
    }

    /// Broadcasts to UI surfaces
    pub fn send(&self, message: BgMessage) {
        self.bus.send(message);
    }

    /// Broadcasts to partner extensions subscribed to the message
    pub fn send_external(&self, message: &BgMessage) {
        self.bus
            .send_external(message, &self.settings.external_extensions);
    }

    /// Shows a notification; failures are only logged
    pub async fn notify(&self, message: impl Into<String>) {
        let notification = Notification::new(message);
        if let Err(e) = self.ports.notifications.notify(notification).await {
            tracing::warn!(error = %e, "Failed to show notification");
        }
    }
}

impl std::fmt::Debug for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionState")
            .field("cache", &self.cache)
            .field("bus", &self.bus)
            .finish_non_exhaustive()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
