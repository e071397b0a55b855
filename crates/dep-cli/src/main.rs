//! Dependency Manager CLI
//!
//! Builds a project's dependency graph from its `component.toml` and keeps
//! the downloaded components in sync.

mod cli;
mod commands;
mod context;
mod error;
mod logging;

use clap::Parser;
use colored::Colorize;

use cli::{Cli, Commands};
use context::ProjectContext;
use error::Result;

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    if let Err(e) = logging::init(cli.verbose) {
        eprintln!("{}: cannot initialize logging: {}", "warning".yellow().bold(), e);
    }
    tracing::debug!(project = %cli.project.display(), "Starting");

    let ctx = ProjectContext::load(&cli.project)?;
    match cli.command {
        Commands::Validate => commands::run_validate(&ctx),
        Commands::List { direct } => commands::run_list(&ctx, direct),
        Commands::Get { force, target } => commands::run_get(&ctx, force, target.as_deref()),
        Commands::Clean => commands::run_clean(&ctx),
    }
}
