//! `append` - add text to the end of a file, creating it if needed.

use trellis_core::{
    application::ports::{TaskContext, TaskOutcome, TaskPlugin},
    domain::{ConflictGroups, DomainError, TaskDefinition, TaskType},
    error::TrellisResult,
};

use super::support::{self, BODY_FIELDS};

pub struct AppendPlugin;

impl AppendPlugin {
    /// Text actually appended: a separating newline is inserted when the
    /// file does not already end with one.
    fn addition(task: &TaskDefinition, existing: Option<&str>, body: &str) -> String {
        let needs_newline = task.config_bool("newline", true)
            && existing.is_some_and(|text| !text.is_empty() && !text.ends_with('\n'));
        if needs_newline {
            format!("\n{body}")
        } else {
            body.to_string()
        }
    }
}

impl TaskPlugin for AppendPlugin {
    fn task_type(&self) -> TaskType {
        TaskType::Append
    }

    fn validate(&self, task: &TaskDefinition) -> Result<(), DomainError> {
        support::require(task, "path")?;
        ConflictGroups::require_exactly_one(&task.id, &task.config, &BODY_FIELDS)?;
        Ok(())
    }

    fn execute(&self, task: &TaskDefinition, ctx: &TaskContext<'_>) -> TrellisResult<TaskOutcome> {
        let path = support::path(task, ctx, "path")?;
        let existing = support::existing(ctx, &path)?;
        let body = support::body(task, ctx, &BODY_FIELDS)?;
        if body.is_empty() {
            return Ok(TaskOutcome::unchanged("nothing to append"));
        }
        if ctx.dry_run {
            return Ok(TaskOutcome::unchanged(format!("would append to {}", path.display())));
        }

        let addition = Self::addition(task, existing.as_deref(), &body);
        ctx.filesystem.append_file(&path, &addition)?;
        Ok(TaskOutcome::changed(format!(
            "appended {} bytes to {}",
            addition.len(),
            path.display()
        )))
    }

    fn diff(&self, task: &TaskDefinition, ctx: &TaskContext<'_>) -> TrellisResult<Option<String>> {
        let path = support::path(task, ctx, "path")?;
        let existing = support::existing(ctx, &path)?.unwrap_or_default();
        let body = support::body(task, ctx, &BODY_FIELDS)?;
        let after = format!("{existing}{}", Self::addition(task, Some(&existing), &body));
        Ok(Some(support::unified(&path, &existing, &after)))
    }
}
