//! `TabGroups` Core Library
//!
//! Engine of a browser tab organizer: it keeps, for every open window and
//! tab, the logical group it belongs to, reconciles that mapping against
//! out-of-order host events, and drives the hide/show transition when a
//! window switches groups.
//!
//! # Crate Structure
//!
//! - [`app`] - The [`TabGroups`] session: startup, options, menus, backups
//! - [`actions`] - Action vocabulary for hotkeys, UI pages and partner extensions
//! - [`apply`] - Group switching with per-window mutual exclusion
//! - [`router`] - Host event handlers and navigation interception
//! - [`session`] - Window/tab to group cache, exclude set, navigation history
//! - [`groups`] - Group persistence, lifecycle and catch rules
//! - [`tabs`] / [`windows`] - Host commands with session bookkeeping
//! - [`host`] - Host ports, event gate and an in-memory host
//! - [`storage`] - Stored document and storage adapters
//! - [`backup`] / [`migration`] - Backups, auto backup and document upgrades
//! - [`config`] - Engine settings and user options

// Enable missing_docs warning for public API documentation
#![warn(missing_docs)]

pub mod actions;
pub mod app;
pub mod apply;
pub mod backup;
pub mod coalesce;
pub mod config;
pub mod containers;
pub mod error;
pub mod groups;
pub mod host;
pub mod messages;
pub mod migration;
pub mod models;
pub mod report;
pub mod router;
pub mod session;
pub mod state;
pub mod storage;
pub mod tabs;
pub mod toolbar;
pub mod tracing;
pub mod windows;

// =============================================================================
// Convenience re-exports
//
// Flat re-exports used by the integration and property tests and by
// `tabgroups-cli`. Library code imports via modular paths.
// =============================================================================

pub use actions::{Action, ActionResponse, GroupRef, external_summary};
pub use app::{MenuContext, TabGroups};
pub use apply::{GroupApplier, Step, position_target};
pub use backup::{
    BackupData, BackupGroup, BackupOptions, BackupPlan, BackupSink, BackupTab,
    JsonFileBackupSink, MergedBackup, RestoreSummary, merge_backup, next_backup_plan,
};
pub use coalesce::CoalescingBatch;
pub use config::{BackupIntervalKey, ExternalExtension, Options, Settings, TimingSettings};
pub use containers::ContainerRegistry;
pub use error::{
    ApplyError, HostError, HostResult, InitError, Result, StorageError, StorageResult,
    TabGroupsError,
};
pub use groups::{CatchRules, GroupManager, GroupStore, GroupTrash, check_rule, find_catching_group};
pub use host::{
    EventGate, HostEvent, HostEventListener, HostPorts, InMemoryHost, NavigationRequest,
    NavigationVerdict,
};
pub use messages::{BgMessage, MessageBus};
pub use migration::{MigrationError, compare_versions, migrate};
pub use models::{
    Container, ContainerDetails, Group, GroupId, GroupPatch, GroupSummary, Hotkey, Tab, TabId,
    Window, WindowId, WindowKind,
};
pub use report::ErrorReporter;
pub use session::{ExcludeGuard, ExcludeSet, GroupHistory, SessionCache};
pub use state::SessionState;
pub use storage::{CURRENT_VERSION, JsonFileStorage, MemoryStorage, StorageAdapter, StoredData};
pub use tabs::{NewTab, TabOps};
pub use toolbar::{MenuCommand, Toolbar};
pub use self::tracing::{
    TracingConfig, TracingError, TracingLevel, TracingOutput, TracingResult, init_tracing,
};
