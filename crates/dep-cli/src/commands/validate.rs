//! Validate command implementation

use colored::Colorize;
use dep_graph::{Graph, ValidationError, ValidatorRegistry};

use crate::context::ProjectContext;
use crate::error::{CliError, Result};

/// Run every built-in validator over the project graph.
///
/// Findings are printed and turn into a failing exit status.
pub fn run_validate(ctx: &ProjectContext) -> Result<()> {
    println!("{} Validating dependency graph...", "=>".blue().bold());

    let graph = ctx.graph(&ctx.root)?;
    let findings = ValidatorRegistry::with_builtins().validate(&graph);

    if findings.is_empty() {
        println!(
            "{} Graph is valid ({} components).",
            "OK".green().bold(),
            graph.component_count()
        );
        return Ok(());
    }

    print_findings(&graph, &findings);
    Err(CliError::user(format!("{} validation finding(s)", findings.len())))
}

pub(crate) fn print_findings(graph: &Graph, findings: &[ValidationError]) {
    for finding in findings {
        println!("   {} {}", "!".red(), finding);
        for id in &finding.components {
            let component = graph.component(*id);
            println!(
                "     {} {}",
                component.name().as_str().cyan(),
                component.version().as_str().dimmed()
            );
        }
    }
}
