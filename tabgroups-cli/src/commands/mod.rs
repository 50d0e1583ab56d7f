//! Command handler modules for the CLI.

mod add;
mod backup;
mod completions;
mod delete;
mod list;
mod migrate;
mod rename;
mod rules;
mod show;
mod stats;

use std::path::Path;

use crate::cli::Commands;
use crate::error::CliError;

/// Dispatch a CLI command to the appropriate handler.
pub fn dispatch(data_path: &Path, command: Commands) -> Result<(), CliError> {
    match command {
        Commands::List { format } => list::cmd_list(data_path, format),
        Commands::Show { group } => show::cmd_show(data_path, &group),
        Commands::Add {
            title,
            color,
            sticky,
        } => add::cmd_add(data_path, title, color, sticky),
        Commands::Delete { group } => delete::cmd_delete(data_path, &group),
        Commands::Rename { group, title } => rename::cmd_rename(data_path, &group, &title),
        Commands::Rules(subcmd) => rules::cmd_rules(data_path, subcmd),
        Commands::Backup { output } => backup::cmd_backup(data_path, output.as_deref()),
        Commands::Restore { file } => backup::cmd_restore(data_path, &file),
        Commands::Migrate { dry_run } => migrate::cmd_migrate(data_path, dry_run),
        Commands::Stats => stats::cmd_stats(data_path),
        Commands::Completions { shell } => completions::cmd_completions(shell),
    }
}
