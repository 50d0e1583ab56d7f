//! Core data structures for `TabGroups`
//!
//! Host objects ([`Tab`], [`Window`], [`Container`]) carry an extension-owned
//! session overlay ([`TabSession`], [`WindowSession`]) that the session cache
//! attaches and detaches. [`Group`] is the persisted unit of organization.

mod container;
mod group;
mod hotkey;
mod ids;
mod tab;
mod window;

pub use container::{Container, ContainerDetails, DEFAULT_COOKIE_STORE_ID, TEMPORARY_CONTAINER};
pub use group::{Group, GroupPatch, GroupSummary, split_rules};
pub use hotkey::Hotkey;
pub use ids::{GroupId, TabId, WindowId};
pub use tab::{
    ChangeInfo, DEFAULT_FAV_ICON, PinnedTab, SharingState, Tab, TabSession, TabStatus,
    is_url_allowed_to_create, is_url_empty, normalize_fav_icon,
};
pub use window::{Window, WindowKind, WindowSession};
