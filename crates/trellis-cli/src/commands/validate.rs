//! `trellis validate`: load, merge, validate and order without running.

use serde::Serialize;
use tracing::instrument;
use trellis_core::domain::DocumentLocation;

use crate::{
    cli::{OutputFormat, ValidateArgs},
    config::AppConfig,
    error::CliResult,
    output::OutputManager,
    session,
};

#[derive(Debug, Serialize)]
struct Summary {
    valid: bool,
    document: String,
    tasks: usize,
    variables: usize,
    prompts: usize,
    order: Vec<String>,
}

#[instrument(skip_all, fields(document = %args.document))]
pub fn execute(args: ValidateArgs, config: &AppConfig, output: &OutputManager) -> CliResult<()> {
    let orchestrator = session::inspector(config)?;
    let (merged, order) = orchestrator.check(&DocumentLocation::parse(&args.document))?;

    let summary = Summary {
        valid: true,
        document: merged.label(),
        tasks: merged.tasks.len(),
        variables: merged.variables.len(),
        prompts: merged.prompts.len(),
        order,
    };

    if output.format() == OutputFormat::Json {
        output.json(&summary)?;
        return Ok(());
    }

    output.success(&format!(
        "{} is valid: {} task(s), {} variable(s), {} prompt(s)",
        summary.document, summary.tasks, summary.variables, summary.prompts
    ))?;
    if !summary.order.is_empty() {
        output.print(&format!("  order: {}", summary.order.join(" → ")))?;
    }
    Ok(())
}
