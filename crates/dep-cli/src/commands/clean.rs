//! Clean command implementation

use colored::Colorize;
use dep_sync::SyncSession;

use crate::context::ProjectContext;
use crate::error::Result;

/// Revert every recorded download of the project.
pub fn run_clean(ctx: &ProjectContext) -> Result<()> {
    let store = ctx.store()?;
    if store.is_empty() {
        println!("{}", "Nothing to clean.".dimmed());
        return Ok(());
    }

    let factory = ctx.factory()?;
    let mut session = SyncSession::new(&factory, store);
    let reverted = session.clean()?;
    println!("{} Removed {} download(s).", "OK".green().bold(), reverted);
    Ok(())
}
