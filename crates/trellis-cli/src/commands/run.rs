//! `trellis run`: resolve documents and execute their tasks.

use std::io::IsTerminal as _;

use serde_json::{Map, Value};
use tracing::{debug, info, instrument};
use trellis_core::application::{RunOptions, RunReport, services::sniff};
use trellis_core::domain::DocumentLocation;

use crate::{
    cli::{OutputFormat, RunArgs},
    config::AppConfig,
    error::{CliError, CliResult, IntoCli},
    output::OutputManager,
    prompter, session,
};

#[instrument(skip_all, fields(documents = args.configs.len(), dry_run = args.dry_run))]
pub fn execute(args: RunArgs, config: &AppConfig, output: &OutputManager) -> CliResult<()> {
    if args.configs.len() > 1 && !args.sequential {
        return Err(CliError::invalid_input(
            "several documents need --sequential; a single run merges one extends chain",
        ));
    }

    let roots: Vec<DocumentLocation> = args
        .configs
        .iter()
        .map(|raw| DocumentLocation::parse(raw))
        .collect();
    let options = options(&args, config)?;
    debug!(cwd = %options.cwd.display(), marker = ?options.marker, "Run options");

    let show_progress = !args.dry_run
        && output.format() == OutputFormat::Human
        && std::io::stderr().is_terminal();
    let orchestrator = session::orchestrator(
        config,
        prompter::choose(args.yes, config.prompts.interactive),
        show_progress,
    )?;

    let report = if args.sequential {
        orchestrator.run_sequential(&roots, options)?
    } else {
        orchestrator.run_document(&roots[0], options)?
    };
    info!(run_id = %report.run_id, completed = report.completed.len(), "Run finished");

    if output.format() == OutputFormat::Json {
        output.json(&report)?;
    } else {
        render(&report, output)?;
    }
    Ok(())
}

fn options(args: &RunArgs, config: &AppConfig) -> CliResult<RunOptions> {
    let cwd = match &args.cwd {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().with_cli_context(|| "reading the current directory")?,
    };

    Ok(RunOptions {
        dry_run: args.dry_run,
        force: args.force,
        cwd,
        variables: typed(&args.vars),
        answers: typed(&args.answers),
        marker: (!args.no_marker).then(|| config.execution.marker_file.clone()),
        ..RunOptions::default()
    })
}

/// `--var port=8080` seeds a number, `--var debug=true` a bool.
fn typed(pairs: &[(String, String)]) -> Map<String, Value> {
    pairs
        .iter()
        .map(|(key, raw)| (key.clone(), sniff(raw)))
        .collect()
}

fn render(report: &RunReport, output: &OutputManager) -> std::io::Result<()> {
    if report.already_completed {
        output.info("Already completed; pass --force to run again")?;
        return Ok(());
    }

    if report.dry_run {
        output.header(&format!("Dry run: {} task(s) would run", report.diffs.len()))?;
        for entry in &report.diffs {
            output.print(&format!("  • {} [{}] {}", entry.id, entry.task_type, entry.summary))?;
            if let Some(diff) = &entry.diff {
                output.diff(diff)?;
            }
        }
    } else {
        output.header(&format!("Ran {} task(s)", report.completed.len()))?;
        for task in &report.completed {
            let line = format!("{}: {}", task.id, task.outcome.summary);
            if task.outcome.changed {
                output.success(&line)?;
            } else {
                output.print(&format!("  {line}"))?;
            }
        }
        for failure in &report.failed {
            output.warning(&format!("{} failed (optional): {}", failure.id, failure.error))?;
        }
    }

    if !report.disabled.is_empty() {
        output.info(&format!("Disabled: {}", report.disabled.join(", ")))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::PathBuf;

    fn args(extra: &[&str]) -> RunArgs {
        use clap::Parser;
        let mut argv = vec!["trellis", "run", "plan.json"];
        argv.extend_from_slice(extra);
        match crate::cli::Cli::parse_from(argv).command {
            crate::cli::Commands::Run(args) => args,
            _ => unreachable!(),
        }
    }

    #[test]
    fn cli_values_are_typed() {
        let pairs = vec![
            ("port".to_string(), "8080".to_string()),
            ("debug".to_string(), "true".to_string()),
            ("name".to_string(), "demo".to_string()),
        ];
        let map = typed(&pairs);
        assert_eq!(map["port"], json!(8080));
        assert_eq!(map["debug"], json!(true));
        assert_eq!(map["name"], json!("demo"));
    }

    #[test]
    fn marker_comes_from_settings_unless_disabled() {
        let config = AppConfig::default();

        let with = options(&args(&["--cwd", "/tmp/x"]), &config).unwrap();
        assert_eq!(with.marker, Some(PathBuf::from(".trellis/completed.json")));
        assert_eq!(with.cwd, PathBuf::from("/tmp/x"));

        let without = options(&args(&["--cwd", "/tmp/x", "--no-marker"]), &config).unwrap();
        assert_eq!(without.marker, None);
    }

    #[test]
    fn flags_reach_run_options() {
        let opts = options(
            &args(&["--cwd", "/w", "-n", "-f", "--var", "env=prod", "--answer", "ok=false"]),
            &AppConfig::default(),
        )
        .unwrap();
        assert!(opts.dry_run);
        assert!(opts.force);
        assert_eq!(opts.variables["env"], json!("prod"));
        assert_eq!(opts.answers["ok"], json!(false));
    }
}
