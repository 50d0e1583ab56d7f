//! Window model

use serde::{Deserialize, Serialize};

use super::{GroupId, WindowId};

/// Host window type; only normal windows are managed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowKind {
    /// Regular browser window
    #[default]
    Normal,
    /// Popup window
    Popup,
    /// Panels, devtools and anything else
    Other,
}

/// Extension-owned overlay attached to a host window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowSession {
    /// Group currently loaded in the window
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<GroupId>,
}

/// Host window with its session overlay
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Window {
    /// Host id
    pub id: WindowId,
    /// Has input focus
    #[serde(default)]
    pub focused: bool,
    /// Window type
    #[serde(default)]
    pub kind: WindowKind,
    /// Private browsing window
    #[serde(default)]
    pub incognito: bool,
    /// Extension session overlay
    #[serde(default)]
    pub session: WindowSession,
}

impl Window {
    /// Creates a normal, unfocused window
    #[must_use]
    pub fn new(id: WindowId) -> Self {
        Self {
            id,
            focused: false,
            kind: WindowKind::Normal,
            incognito: false,
            session: WindowSession::default(),
        }
    }

    /// Only normal, non-private windows are managed
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        self.kind == WindowKind::Normal && !self.incognito
    }
}
