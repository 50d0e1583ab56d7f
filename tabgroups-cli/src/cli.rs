//! CLI argument parsing types using `clap`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

/// `TabGroups` command-line interface for maintaining data documents
#[derive(Parser)]
#[command(name = "tabgroups-cli")]
#[command(author, version, about = "TabGroups command-line interface")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the data document (JSON)
    #[arg(short, long, global = true, env = "TABGROUPS_DATA")]
    pub data: Option<PathBuf>,

    /// Increase output verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except results
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// List all groups
    #[command(about = "List all groups in the data document")]
    List {
        /// Output format for the group list
        #[arg(short, long, default_value = "table", value_enum)]
        format: OutputFormat,
    },

    /// Show group details
    #[command(about = "Show details of a group")]
    Show {
        /// Group id or title
        group: String,
    },

    /// Add a new group
    #[command(about = "Add a new group to the data document")]
    Add {
        /// Title for the new group
        #[arg(short, long)]
        title: Option<String>,

        /// Icon color (CSS color)
        #[arg(long)]
        color: Option<String>,

        /// Exempt the group from other groups' catch rules
        #[arg(long)]
        sticky: bool,
    },

    /// Delete a group
    #[command(about = "Delete a group and its hotkeys")]
    Delete {
        /// Group id or title
        group: String,
    },

    /// Rename a group
    #[command(about = "Change the title of a group")]
    Rename {
        /// Group id or title
        group: String,

        /// New title
        title: String,
    },

    /// Catch rule management
    #[command(subcommand)]
    Rules(RulesCommands),

    /// Write a backup of the data document
    #[command(about = "Write a backup file of groups, hotkeys and options")]
    Backup {
        /// Output file; defaults to a timestamped file in the current directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Merge a backup into the data document
    #[command(about = "Merge a backup file into the data document")]
    Restore {
        /// Backup file
        file: PathBuf,
    },

    /// Upgrade the data document to the current format
    #[command(about = "Upgrade a data document written by an older release")]
    Migrate {
        /// Report what would change without writing
        #[arg(long)]
        dry_run: bool,
    },

    /// Show statistics
    #[command(about = "Show statistics about the data document")]
    Stats,

    /// Generate shell completions
    #[command(about = "Generate shell completion scripts")]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Catch rule subcommands
#[derive(Subcommand)]
pub enum RulesCommands {
    /// Add a url pattern to a group
    #[command(about = "Add a catch rule (regular expression) to a group")]
    Add {
        /// Group id or title
        group: String,

        /// Regular expression matched against tab urls
        pattern: String,
    },

    /// Remove a url pattern from a group
    #[command(about = "Remove a catch rule from a group")]
    Remove {
        /// Group id or title
        group: String,

        /// Pattern to remove, as listed by `show`
        pattern: String,
    },

    /// Show which group catches a url
    #[command(about = "Test which group's catch rules match a url")]
    Test {
        /// Url to test
        url: String,
    },
}

/// Output format options
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// JSON
    Json,
    /// Comma separated values
    Csv,
}
