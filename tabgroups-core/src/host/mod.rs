//! Browser host boundary
//!
//! The engine never talks to a browser directly. Commands go through the
//! port traits in [`ports`], events arrive through [`events`]. A complete
//! in-memory implementation lives in [`memory`].

pub mod events;
pub mod memory;
pub mod ports;

use std::sync::Arc;

use crate::storage::StorageAdapter;

pub use events::{
    EventGate, HostEvent, HostEventListener, HostEventSource, NavigationRequest,
    NavigationVerdict, PauseGuard, Subscription,
};
pub use memory::{HostCall, InMemoryHost};
pub use ports::{
    ContainerPort, CreateTabProps, CreateWindowProps, MenuItem, Notification, NotificationPort,
    SessionValuesPort, TabPort, TabQuery, TabUpdate, ToolbarPort, WindowPort,
};

/// Every collaborator the engine needs from its host
#[derive(Clone)]
pub struct HostPorts {
    /// Tab commands
    pub tabs: Arc<dyn TabPort>,
    /// Window commands
    pub windows: Arc<dyn WindowPort>,
    /// Per-tab and per-window stored values
    pub sessions: Arc<dyn SessionValuesPort>,
    /// Identity containers
    pub containers: Arc<dyn ContainerPort>,
    /// Notifications
    pub notifications: Arc<dyn NotificationPort>,
    /// Toolbar button and menus
    pub toolbar: Arc<dyn ToolbarPort>,
    /// Lifecycle events
    pub events: Arc<dyn HostEventSource>,
    /// Persistent document
    pub storage: Arc<dyn StorageAdapter>,
}

impl HostPorts {
    /// Wires every port to one in-memory host
    #[must_use]
    pub fn in_memory(host: &Arc<InMemoryHost>, storage: Arc<dyn StorageAdapter>) -> Self {
        Self {
            tabs: Arc::clone(host) as Arc<dyn TabPort>,
            windows: Arc::clone(host) as Arc<dyn WindowPort>,
            sessions: Arc::clone(host) as Arc<dyn SessionValuesPort>,
            containers: Arc::clone(host) as Arc<dyn ContainerPort>,
            notifications: Arc::clone(host) as Arc<dyn NotificationPort>,
            toolbar: Arc::clone(host) as Arc<dyn ToolbarPort>,
            events: Arc::clone(host) as Arc<dyn HostEventSource>,
            storage,
        }
    }
}

impl std::fmt::Debug for HostPorts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostPorts").finish_non_exhaustive()
    }
}
