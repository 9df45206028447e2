//! Helpers shared by the built-in plugins.

use std::path::{Path, PathBuf};

use similar::TextDiff;
use trellis_core::{
    application::{ApplicationError, ports::TaskContext},
    domain::{ConflictGroups, DocumentLocation, DomainError, TaskDefinition},
    error::{TrellisError, TrellisResult},
};

pub(crate) const BODY_FIELDS: [&str; 3] = ["content", "template", "templateFile"];

pub(crate) fn require(task: &TaskDefinition, key: &str) -> Result<(), DomainError> {
    match task.config_str(key) {
        Some(value) if !value.trim().is_empty() => Ok(()),
        _ => Err(DomainError::PluginConfiguration {
            task: task.id.clone(),
            reason: format!("`{key}` is required"),
        }),
    }
}

/// A config string rendered against the run context.
pub(crate) fn rendered(
    task: &TaskDefinition,
    ctx: &TaskContext<'_>,
    key: &str,
) -> TrellisResult<String> {
    let raw = task
        .config_str(key)
        .ok_or_else(|| DomainError::PluginConfiguration {
            task: task.id.clone(),
            reason: format!("`{key}` is required"),
        })?;
    ctx.render(raw)
}

/// Rendered path config, resolved against the working directory.
pub(crate) fn path(task: &TaskDefinition, ctx: &TaskContext<'_>, key: &str) -> TrellisResult<PathBuf> {
    Ok(ctx.resolve_path(&rendered(task, ctx, key)?))
}

/// A file referenced by a task, relative to the document that declared it.
pub(crate) fn referenced(task: &TaskDefinition, ctx: &TaskContext<'_>, file: &str) -> DocumentLocation {
    match &task.provenance {
        Some(provenance) => provenance.source.join(file),
        None => DocumentLocation::parse(&ctx.resolve_path(file).to_string_lossy()),
    }
}

/// Text from whichever field of `group` is set: inline fields are
/// rendered directly, the file variant (last in the group) is fetched
/// first.
pub(crate) fn body(
    task: &TaskDefinition,
    ctx: &TaskContext<'_>,
    group: &[&str],
) -> TrellisResult<String> {
    let field = ConflictGroups::require_exactly_one(&task.id, &task.config, group)?;
    let is_file = group.last().is_some_and(|last| *last == field);
    if !is_file {
        return rendered(task, ctx, field);
    }

    let file = rendered(task, ctx, field)?;
    let template = ctx.fetcher.fetch(&referenced(task, ctx, &file))?;
    ctx.render(&template)
}

pub(crate) fn existing(ctx: &TaskContext<'_>, path: &Path) -> TrellisResult<Option<String>> {
    if ctx.filesystem.exists(path) && !ctx.filesystem.is_dir(path) {
        ctx.filesystem.read_file(path).map(Some)
    } else {
        Ok(None)
    }
}

/// Unified diff of `old` → `new`, labelled with `path`.
pub(crate) fn unified(path: &Path, old: &str, new: &str) -> String {
    let label = path.display().to_string();
    TextDiff::from_lines(old, new)
        .unified_diff()
        .context_radius(3)
        .header(&label, &label)
        .to_string()
}

pub(crate) fn failed(task: &TaskDefinition, reason: impl Into<String>) -> TrellisError {
    ApplicationError::TaskFailed {
        task: task.id.clone(),
        reason: reason.into(),
    }
    .into()
}
