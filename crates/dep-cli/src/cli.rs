//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Dependency Manager - fetch and clean the components a project depends on
#[derive(Parser, Debug)]
#[command(name = "depman")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Folder holding the project's component.toml
    #[arg(short = 'C', long, global = true, env = "DEPMAN_PROJECT", default_value = ".")]
    pub project: PathBuf,

    /// The command to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Build the dependency graph and report cycles and side-by-side anomalies
    Validate,

    /// List the components the project depends on
    List {
        /// Only direct dependencies of the project
        #[arg(long)]
        direct: bool,
    },

    /// Download every dependency into the target folder
    ///
    /// Examples:
    ///   depman get                 # Incremental sync into the project folder
    ///   depman get --force         # Fetch everything again
    ///   depman get -t ../deps      # Place components below ../deps
    Get {
        /// Ignore watermarks and fetch every item
        #[arg(short, long)]
        force: bool,

        /// Root folder components are placed under (defaults to the project)
        #[arg(short, long)]
        target: Option<PathBuf>,
    },

    /// Remove everything previous downloads created
    Clean,
}
