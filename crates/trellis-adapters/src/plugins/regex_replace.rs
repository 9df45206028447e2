//! `regex-replace` - rewrite matches in a file.
//!
//! The replacement uses `regex` syntax (`$1`, `${name}`). `global` (default
//! true) replaces every match; otherwise only the first.

use regex::Regex;
use tracing::debug;
use trellis_core::{
    application::ports::{TaskContext, TaskOutcome, TaskPlugin},
    domain::{ConflictGroups, DomainError, TaskDefinition, TaskType, placeholders},
    error::TrellisResult,
};

use super::support;

const REPLACEMENT_FIELDS: [&str; 2] = ["replacement", "replacementFile"];

pub struct RegexReplacePlugin;

impl RegexReplacePlugin {
    fn compile(task: &TaskDefinition, pattern: &str) -> Result<Regex, DomainError> {
        Regex::new(pattern).map_err(|e| DomainError::PluginConfiguration {
            task: task.id.clone(),
            reason: format!("invalid pattern: {e}"),
        })
    }

    /// Current and rewritten file contents.
    fn rewrite(task: &TaskDefinition, ctx: &TaskContext<'_>) -> TrellisResult<(String, String)> {
        let path = support::path(task, ctx, "path")?;
        let current = ctx.filesystem.read_file(&path)?;
        let regex = Self::compile(task, &support::rendered(task, ctx, "pattern")?)?;
        let replacement = support::body(task, ctx, &REPLACEMENT_FIELDS)?;

        let updated = if task.config_bool("global", true) {
            regex.replace_all(&current, replacement.as_str())
        } else {
            regex.replace(&current, replacement.as_str())
        }
        .into_owned();
        Ok((current, updated))
    }
}

impl TaskPlugin for RegexReplacePlugin {
    fn task_type(&self) -> TaskType {
        TaskType::RegexReplace
    }

    fn validate(&self, task: &TaskDefinition) -> Result<(), DomainError> {
        support::require(task, "path")?;
        support::require(task, "pattern")?;
        ConflictGroups::require_exactly_one(&task.id, &task.config, &REPLACEMENT_FIELDS)?;

        // Patterns with placeholders are only known after resolution.
        if let Some(pattern) = task.config_str("pattern") {
            if placeholders(pattern).is_empty() {
                Self::compile(task, pattern)?;
            }
        }
        Ok(())
    }

    fn execute(&self, task: &TaskDefinition, ctx: &TaskContext<'_>) -> TrellisResult<TaskOutcome> {
        let path = support::path(task, ctx, "path")?;
        let (current, updated) = Self::rewrite(task, ctx)?;
        if current == updated {
            debug!(task = %task.id, "Pattern did not match");
            return Ok(TaskOutcome::unchanged(format!("no matches in {}", path.display())));
        }
        if ctx.dry_run {
            return Ok(TaskOutcome::unchanged(format!("would edit {}", path.display())));
        }

        ctx.filesystem.write_file(&path, &updated)?;
        Ok(TaskOutcome::changed(format!("edited {}", path.display())))
    }

    fn diff(&self, task: &TaskDefinition, ctx: &TaskContext<'_>) -> TrellisResult<Option<String>> {
        let path = support::path(task, ctx, "path")?;
        let (current, updated) = Self::rewrite(task, ctx)?;
        Ok(Some(support::unified(&path, &current, &updated)))
    }
}
