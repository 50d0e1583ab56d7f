//! Keyboard shortcut bindings stored in the data document

use serde::{Deserialize, Serialize};

use super::GroupId;

/// A user-defined hotkey bound to an action
///
/// Hotkeys are captured by content pages; the engine only stores them and
/// keeps their `group_id` consistent across backup restore.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hotkey {
    /// Key as reported by the keyboard event
    #[serde(default)]
    pub key: String,
    /// Key code
    #[serde(default)]
    pub key_code: u32,
    /// Control modifier
    #[serde(default)]
    pub ctrl_key: bool,
    /// Shift modifier
    #[serde(default)]
    pub shift_key: bool,
    /// Alt modifier
    #[serde(default)]
    pub alt_key: bool,
    /// Meta (command) modifier
    #[serde(default)]
    pub meta_key: bool,
    /// Action name, same vocabulary as external actions
    pub action: String,
    /// Group the action targets, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<GroupId>,
}
