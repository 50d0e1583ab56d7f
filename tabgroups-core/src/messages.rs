//! Internal message boundary
//!
//! UI surfaces and partner extensions learn about state changes through
//! small tagged records. Delivery is best effort: a message nobody listens
//! to is dropped, and nothing is sent before startup completes.

use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use tokio::sync::broadcast;

use crate::config::ExternalExtension;
use crate::models::{ChangeInfo, Group, GroupId, GroupSummary, Tab, TabId, WindowId};

const CHANNEL_CAPACITY: usize = 256;

/// Tab id with the properties that changed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TabChange {
    /// Tab id
    pub id: TabId,
    /// Changed properties
    #[serde(flatten)]
    pub change: ChangeInfo,
}

impl TabChange {
    /// Change of a single flag, as used for activation and discard
    #[must_use]
    pub fn new(id: TabId, change: ChangeInfo) -> Self {
        Self { id, change }
    }
}

/// Group id with its refreshed tab list or settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupUpdate {
    /// Group id
    pub id: GroupId,
    /// Current tabs of the group
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tabs: Option<Vec<Tab>>,
    /// Current settings of the group
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<Group>,
}

impl GroupUpdate {
    /// Update carrying the group's tabs
    #[must_use]
    pub fn tabs(id: GroupId, tabs: Vec<Tab>) -> Self {
        Self {
            id,
            tabs: Some(tabs),
            settings: None,
        }
    }

    /// Update carrying the group's settings
    #[must_use]
    pub fn settings(group: &Group) -> Self {
        Self {
            id: group.id,
            tabs: None,
            settings: Some(group.without_tabs()),
        }
    }
}

/// Broadcast message, serialized with an `action` tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum BgMessage {
    /// A group application finished
    GroupLoaded {
        /// Group that was applied
        group_id: GroupId,
        /// Window it was applied in
        window_id: WindowId,
        /// Outcome
        ok: bool,
    },
    /// Tabs or settings of a group changed
    GroupUpdated {
        /// The change
        group: GroupUpdate,
    },
    /// A group was created
    GroupAdded {
        /// The new group
        group: GroupSummary,
    },
    /// A group was deleted
    GroupRemoved {
        /// Deleted group
        group_id: GroupId,
    },
    /// A tab joined the loaded group of its window
    TabAdded {
        /// The tab with its session
        tab: Tab,
    },
    /// Properties of a grouped tab changed
    TabUpdated {
        /// The change
        tab: TabChange,
    },
    /// A tab left its group or was closed
    TabRemoved {
        /// Tab id
        tab_id: TabId,
    },
    /// User options changed
    OptionsUpdated,
    /// Startup finished
    IAmBack,
}

impl BgMessage {
    /// Action tag of the message
    #[must_use]
    pub const fn action(&self) -> &'static str {
        match self {
            Self::GroupLoaded { .. } => "group-loaded",
            Self::GroupUpdated { .. } => "group-updated",
            Self::GroupAdded { .. } => "group-added",
            Self::GroupRemoved { .. } => "group-removed",
            Self::TabAdded { .. } => "tab-added",
            Self::TabUpdated { .. } => "tab-updated",
            Self::TabRemoved { .. } => "tab-removed",
            Self::OptionsUpdated => "options-updated",
            Self::IAmBack => "i-am-back",
        }
    }

    /// Shorthand for a `tab-updated` message
    #[must_use]
    pub fn tab_updated(id: TabId, change: ChangeInfo) -> Self {
        Self::TabUpdated {
            tab: TabChange::new(id, change),
        }
    }
}

/// Message addressed to a partner extension
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalMessage {
    /// Recipient extension id
    pub extension_id: String,
    /// The message
    pub message: BgMessage,
}

/// Broadcast hub for UI surfaces and partner extensions
pub struct MessageBus {
    internal: broadcast::Sender<BgMessage>,
    external: broadcast::Sender<ExternalMessage>,
    ready: AtomicBool,
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageBus {
    /// Creates a bus that drops messages until [`set_ready`](Self::set_ready)
    #[must_use]
    pub fn new() -> Self {
        let (internal, _) = broadcast::channel(CHANNEL_CAPACITY);
        let (external, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            internal,
            external,
            ready: AtomicBool::new(false),
        }
    }

    /// Receives internal broadcasts
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<BgMessage> {
        self.internal.subscribe()
    }

    /// Receives messages for partner extensions
    #[must_use]
    pub fn subscribe_external(&self) -> broadcast::Receiver<ExternalMessage> {
        self.external.subscribe()
    }

    /// Enables or disables delivery
    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    /// Returns true once startup completed
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    /// Broadcasts to UI surfaces
    pub fn send(&self, message: BgMessage) {
        if !self.is_ready() {
            tracing::debug!(action = message.action(), "Not yet loaded, message dropped");
            return;
        }

        tracing::debug!(action = message.action(), "Broadcast");
        // No receivers is not an error
        let _ = self.internal.send(message);
    }

    /// Sends to every partner extension subscribed to the message's action
    ///
    /// Returns the ids of the recipients.
    pub fn send_external(&self, message: &BgMessage, extensions: &[ExternalExtension]) -> Vec<String> {
        if !self.is_ready() {
            tracing::debug!(action = message.action(), "Not yet loaded, external message dropped");
            return Vec::new();
        }

        let action = message.action();
        extensions
            .iter()
            .filter(|ext| ext.get_actions.iter().any(|a| a == action))
            .map(|ext| {
                let _ = self.external.send(ExternalMessage {
                    extension_id: ext.id.clone(),
                    message: message.clone(),
                });
                ext.id.clone()
            })
            .collect()
    }
}

impl std::fmt::Debug for MessageBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageBus")
            .field("ready", &self.is_ready())
            .field("receivers", &self.internal.receiver_count())
            .finish()
    }
}
