//! `TabGroups` CLI - offline maintenance of `TabGroups` data documents
//!
//! Lists and edits groups and their catch rules, creates and restores
//! backups, and upgrades documents written by older releases.

mod cli;
mod commands;
mod error;
mod format;
mod util;

use clap::Parser;
use cli::Cli;
use tabgroups_core::{TracingConfig, TracingLevel, init_tracing};

fn main() {
    let cli = Cli::parse();

    if !cli.quiet {
        let config = TracingConfig::new().with_level(TracingLevel::from_verbosity(cli.verbose));
        if let Err(e) = init_tracing(&config) {
            eprintln!("Failed to initialize logging: {e}");
        }
    }

    let data_path = match util::resolve_data_path(cli.data.as_deref()) {
        Ok(path) => path,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(e.exit_code());
        }
    };

    let result = commands::dispatch(&data_path, cli.command);

    if let Err(e) = result {
        if !cli.quiet {
            eprintln!("Error: {e}");
        }
        std::process::exit(e.exit_code());
    }
}
