//! CLI error types and exit codes.

use tabgroups_core::{MigrationError, StorageError, TabGroupsError};

/// Exit codes for CLI operations
pub mod exit_codes {
    /// General error - arguments, validation, or IO
    pub const GENERAL_ERROR: i32 = 1;
    /// The named group does not exist or the name is ambiguous
    pub const GROUP_NOT_FOUND: i32 = 2;
    /// The data document or backup cannot be read or upgraded
    pub const DATA_ERROR: i32 = 3;
}

/// CLI error type
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Group not found
    #[error("Group not found: {0}")]
    GroupNotFound(String),

    /// Several groups match a name
    #[error("Ambiguous group name '{name}'. Matches: {matches}")]
    AmbiguousGroup {
        /// Requested name
        name: String,
        /// Titles of the matching groups
        matches: String,
    },

    /// Invalid catch rule
    #[error("Invalid catch rule: {0}")]
    Rule(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Migration error
    #[error("Migration error: {0}")]
    Migration(String),

    /// Backup error
    #[error("Backup error: {0}")]
    Backup(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<TabGroupsError> for CliError {
    fn from(err: TabGroupsError) -> Self {
        match err {
            TabGroupsError::Storage(e) => e.into(),
            TabGroupsError::Migration(e) => e.into(),
            TabGroupsError::GroupNotFound(id) => Self::GroupNotFound(id.to_string()),
            TabGroupsError::Config(e) => Self::Config(e),
            TabGroupsError::Serialization(e) => Self::Backup(e.to_string()),
            other => Self::Config(other.to_string()),
        }
    }
}

impl From<StorageError> for CliError {
    fn from(err: StorageError) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<MigrationError> for CliError {
    fn from(err: MigrationError) -> Self {
        Self::Migration(err.to_string())
    }
}

impl CliError {
    /// Returns the appropriate exit code for this error type.
    ///
    /// Exit codes:
    /// - 0: Success (not an error)
    /// - 1: General error (configuration, validation, IO)
    /// - 2: Group not found or ambiguous
    /// - 3: Unreadable document or backup, failed upgrade
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::GroupNotFound(_) | Self::AmbiguousGroup { .. } => exit_codes::GROUP_NOT_FOUND,
            Self::Storage(_) | Self::Migration(_) | Self::Backup(_) => exit_codes::DATA_ERROR,
            Self::Config(_) | Self::Rule(_) | Self::Io(_) => exit_codes::GENERAL_ERROR,
        }
    }
}
