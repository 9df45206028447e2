//! `exec` - run a shell command or a script.

use serde_json::Value;
use tracing::{debug, instrument};
use trellis_core::{
    application::ports::{ScriptSource, TaskContext, TaskOutcome, TaskPlugin},
    domain::{ConflictGroups, DocumentLocation, DomainError, TaskDefinition, TaskType},
    error::TrellisResult,
};

use super::support;

const COMMAND_FIELDS: [&str; 2] = ["command", "script"];

pub struct ExecPlugin;

impl ExecPlugin {
    fn args(task: &TaskDefinition, ctx: &TaskContext<'_>) -> TrellisResult<Vec<String>> {
        match task.config.get("args") {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => ctx.render(s),
                    other => Ok(other.to_string()),
                })
                .collect(),
            Some(_) => Err(DomainError::PluginConfiguration {
                task: task.id.clone(),
                reason: "`args` must be an array".into(),
            }
            .into()),
        }
    }

    fn script(task: &TaskDefinition, ctx: &TaskContext<'_>) -> TrellisResult<ScriptSource> {
        let reference = support::rendered(task, ctx, "script")?;
        let location = support::referenced(task, ctx, &reference);
        Ok(match &location {
            // Document paths are relative to the process, not the task cwd.
            DocumentLocation::Local(path) => {
                ScriptSource::Path(std::path::absolute(path).unwrap_or_else(|_| path.clone()))
            }
            DocumentLocation::Remote(_) => ScriptSource::Inline {
                contents: ctx.fetcher.fetch(&location)?,
                extension: location.extension(),
            },
        })
    }
}

impl TaskPlugin for ExecPlugin {
    fn task_type(&self) -> TaskType {
        TaskType::Exec
    }

    fn validate(&self, task: &TaskDefinition) -> Result<(), DomainError> {
        ConflictGroups::require_exactly_one(&task.id, &task.config, &COMMAND_FIELDS)?;
        Ok(())
    }

    #[instrument(skip_all, fields(task = %task.id))]
    fn execute(&self, task: &TaskDefinition, ctx: &TaskContext<'_>) -> TrellisResult<TaskOutcome> {
        let cwd = match task.config_str("cwd") {
            Some(dir) => ctx.resolve_path(&ctx.render(dir)?),
            None => ctx.cwd.to_path_buf(),
        };
        let field = ConflictGroups::require_exactly_one(&task.id, &task.config, &COMMAND_FIELDS)?;

        let (label, output) = if field == "command" {
            let command = support::rendered(task, ctx, "command")?;
            if ctx.dry_run {
                return Ok(TaskOutcome::unchanged(format!("would run `{command}`")));
            }
            let output = ctx.runner.run_shell(&command, Some(&cwd))?;
            (command, output)
        } else {
            let script = Self::script(task, ctx)?;
            let args = Self::args(task, ctx)?;
            let label = match &script {
                ScriptSource::Path(path) => path.display().to_string(),
                ScriptSource::Inline { .. } => "<remote script>".to_string(),
            };
            if ctx.dry_run {
                return Ok(TaskOutcome::unchanged(format!("would run {label}")));
            }
            let output = ctx.runner.run_script(&script, &args, Some(&cwd))?;
            (label, output)
        };

        if !output.success() {
            let detail = output.stderr.trim();
            return Err(support::failed(
                task,
                format!(
                    "`{label}` exited with {}{}",
                    output
                        .status
                        .map_or_else(|| "a signal".to_string(), |code| code.to_string()),
                    if detail.is_empty() {
                        String::new()
                    } else {
                        format!(": {detail}")
                    }
                ),
            ));
        }

        debug!(stdout = %output.stdout.trim(), "Command output");
        Ok(TaskOutcome::changed(format!("ran {label}")))
    }
}
