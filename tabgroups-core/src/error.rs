//! Error types for `TabGroups`
//!
//! Errors are split by concern: host command failures, storage failures,
//! the crate-wide [`TabGroupsError`], and the fatal [`InitError`] raised
//! while the session state starts up.

use thiserror::Error;

use crate::models::{GroupId, TabId, WindowId};

/// Errors reported by the host (browser) when a command fails
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HostError {
    /// Tab does not exist (already closed or id recycled)
    #[error("Tab not found: {0}")]
    TabNotFound(TabId),

    /// Window does not exist
    #[error("Window not found: {0}")]
    WindowNotFound(WindowId),

    /// Container (cookie store) does not exist
    #[error("Container not found: {0}")]
    ContainerNotFound(String),

    /// Host refused the command
    #[error("Host rejected command '{command}': {reason}")]
    Rejected {
        /// Command name
        command: &'static str,
        /// Host supplied reason
        reason: String,
    },
}

/// Result type for host port calls
pub type HostResult<T> = std::result::Result<T, HostError>;

/// Errors raised by the persistent storage adapter
#[derive(Debug, Error)]
pub enum StorageError {
    /// Failed to read the document
    #[error("Failed to read storage: {0}")]
    Read(String),

    /// Failed to write the document
    #[error("Failed to write storage: {0}")]
    Write(String),

    /// Document content is not valid
    #[error("Invalid storage document: {0}")]
    InvalidDocument(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Crate-wide error type
#[derive(Debug, Error)]
pub enum TabGroupsError {
    /// Host command failed
    #[error("Host error: {0}")]
    Host(#[from] HostError),

    /// Storage failure
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Group id is unknown
    #[error("Group not found: {0}")]
    GroupNotFound(GroupId),

    /// Operation refused for safety, user already notified
    #[error("Operation vetoed: {0}")]
    Vetoed(String),

    /// No normal browser window is available
    #[error("Normal window not found")]
    NoNormalWindow,

    /// External or internal action is unknown or malformed
    #[error("Invalid action: {0}")]
    InvalidAction(String),

    /// Data migration failed
    #[error("Migration error: {0}")]
    Migration(#[from] crate::migration::MigrationError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for `TabGroups` operations
pub type Result<T> = std::result::Result<T, TabGroupsError>;

/// Errors inside a group application
///
/// Never escapes [`GroupApplier::apply_group`](crate::apply::GroupApplier::apply_group):
/// a veto is absorbed silently, everything else is reported.
#[derive(Debug, Error)]
pub enum ApplyError {
    /// A tab of the group being hidden cannot be hidden
    #[error("Group switch vetoed: {0}")]
    Vetoed(String),

    /// Target group does not exist
    #[error("Group not found: {0}")]
    GroupNotFound(GroupId),

    /// Host command failed midway
    #[error("Host error: {0}")]
    Host(#[from] HostError),

    /// Engine failure (storage, window lookup)
    #[error(transparent)]
    Engine(#[from] TabGroupsError),
}

/// Fatal errors that abort startup
#[derive(Debug, Error)]
pub enum InitError {
    /// Stored document could not be read
    #[error("Storage is unreadable: {0}")]
    StorageUnreadable(#[source] StorageError),

    /// Stored document could not be migrated to the current version
    #[error("Data migration failed: {0}")]
    Migration(#[source] crate::migration::MigrationError),

    /// No normal window is open, nothing can be managed
    #[error("No normal windows found")]
    NoWindows,

    /// Host failed during startup reconciliation
    #[error("Host error during startup: {0}")]
    Host(#[from] HostError),

    /// Any other failure during startup
    #[error("Startup failed: {0}")]
    Other(#[from] TabGroupsError),
}
