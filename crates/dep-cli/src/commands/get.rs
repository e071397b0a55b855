//! Get command implementation

use std::path::Path;

use colored::Colorize;
use dep_graph::ValidatorRegistry;
use dep_sync::SyncSession;

use crate::commands::validate::print_findings;
use crate::context::ProjectContext;
use crate::error::Result;

/// Download every dependency below `target` (the project folder by default).
///
/// Validation findings are reported as warnings; they do not stop the sync.
pub fn run_get(ctx: &ProjectContext, force: bool, target: Option<&Path>) -> Result<()> {
    let target = match target {
        Some(target) if target.is_absolute() => target.to_path_buf(),
        Some(target) => std::env::current_dir()?.join(target),
        None => ctx.root.clone(),
    };
    println!(
        "{} Synchronizing dependencies into {}...",
        "=>".blue().bold(),
        target.display()
    );

    let graph = ctx.graph(&target)?;
    let findings = ValidatorRegistry::with_builtins().validate(&graph);
    if !findings.is_empty() {
        println!("{} The dependency graph has findings:", "WARN".yellow().bold());
        print_findings(&graph, &findings);
    }

    let factory = ctx.factory()?;
    let mut session = SyncSession::new(&factory, ctx.store()?);
    let report = session.get(&graph, force)?;

    for key in &report.synced {
        println!("   {} {}", "+".green(), key);
    }
    println!(
        "{} Synchronized {} component(s).",
        "OK".green().bold(),
        report.synced.len()
    );
    Ok(())
}
