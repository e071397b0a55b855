//! List command implementation

use colored::Colorize;
use dep_sync::SyncSession;

use crate::context::ProjectContext;
use crate::error::Result;

pub fn run_list(ctx: &ProjectContext, direct: bool) -> Result<()> {
    let graph = ctx.graph(&ctx.root)?;
    let components = graph.flattened(false, !direct);

    if components.is_empty() {
        println!("{}", "No dependencies.".dimmed());
        return Ok(());
    }

    println!("{}", "Dependencies:".bold());
    for component in components {
        let destination = SyncSession::destination_for(&graph, component)?;
        let relative = destination.strip_prefix(&ctx.root).unwrap_or(&destination);
        println!(
            "   {} {} {} {} {}",
            component.name().as_str().cyan(),
            component.version(),
            format!("({})", component.kind()).dimmed(),
            "->".dimmed(),
            relative.display()
        );
    }
    Ok(())
}
