//! `write` - create or overwrite a file.

use tracing::{debug, warn};
use trellis_core::{
    application::ports::{TaskContext, TaskOutcome, TaskPlugin},
    domain::{ConflictGroups, DomainError, TaskDefinition, TaskType},
    error::TrellisResult,
};

use super::support::{self, BODY_FIELDS};

pub struct WritePlugin;

impl WritePlugin {
    fn may_overwrite(task: &TaskDefinition, ctx: &TaskContext<'_>) -> bool {
        ctx.force || task.config_bool("overwrite", false)
    }
}

impl TaskPlugin for WritePlugin {
    fn task_type(&self) -> TaskType {
        TaskType::Write
    }

    fn validate(&self, task: &TaskDefinition) -> Result<(), DomainError> {
        support::require(task, "path")?;
        ConflictGroups::require_exactly_one(&task.id, &task.config, &BODY_FIELDS)?;
        Ok(())
    }

    fn execute(&self, task: &TaskDefinition, ctx: &TaskContext<'_>) -> TrellisResult<TaskOutcome> {
        let path = support::path(task, ctx, "path")?;
        let existing = support::existing(ctx, &path)?;

        if existing.is_some() && !Self::may_overwrite(task, ctx) {
            warn!(task = %task.id, path = %path.display(), "File exists; not overwriting");
            return Ok(TaskOutcome::unchanged(format!(
                "kept existing {}",
                path.display()
            )));
        }

        let content = support::body(task, ctx, &BODY_FIELDS)?;
        if existing.as_deref() == Some(content.as_str()) {
            return Ok(TaskOutcome::unchanged(format!("{} is up to date", path.display())));
        }
        if ctx.dry_run {
            return Ok(TaskOutcome::unchanged(format!("would write {}", path.display())));
        }

        ctx.filesystem.write_file(&path, &content)?;
        debug!(task = %task.id, path = %path.display(), bytes = content.len(), "Wrote file");
        Ok(TaskOutcome::changed(format!("wrote {}", path.display())))
    }

    fn diff(&self, task: &TaskDefinition, ctx: &TaskContext<'_>) -> TrellisResult<Option<String>> {
        let path = support::path(task, ctx, "path")?;
        let existing = support::existing(ctx, &path)?;
        if existing.is_some() && !Self::may_overwrite(task, ctx) {
            return Ok(None);
        }
        let content = support::body(task, ctx, &BODY_FIELDS)?;
        Ok(Some(support::unified(
            &path,
            existing.as_deref().unwrap_or_default(),
            &content,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::support::testing::Harness;
    use trellis_core::domain::Provenance;

    fn task() -> TaskDefinition {
        TaskDefinition::new("readme", TaskType::Write)
            .with_config("path", "README.md")
            .with_config("content", "# {{name}}\n")
    }

    #[test]
    fn writes_rendered_content() {
        let mut h = Harness::new();
        h.context.insert("name", "demo");

        let outcome = WritePlugin.execute(&task(), &h.ctx(false)).unwrap();
        assert!(outcome.changed);
        assert_eq!(h.fs.contents("/work/README.md").as_deref(), Some("# demo\n"));
    }

    #[test]
    fn keeps_existing_files_unless_forced() {
        let h = Harness::new();
        h.seed("/work/README.md", "old\n");

        let outcome = WritePlugin.execute(&task(), &h.ctx(false)).unwrap();
        assert!(!outcome.changed);
        assert_eq!(h.fs.contents("/work/README.md").as_deref(), Some("old\n"));

        WritePlugin.execute(&task(), &h.ctx(true)).unwrap();
        assert_eq!(h.fs.contents("/work/README.md").as_deref(), Some("# \n"));
    }

    #[test]
    fn template_file_is_relative_to_the_declaring_document() {
        let mut h = Harness::new();
        h.fetcher.insert("templates/LICENSE.tpl", "(c) {{owner}}");
        h.context.insert("owner", "ada");
        let mut task = TaskDefinition::new("license", TaskType::Write)
            .with_config("path", "LICENSE")
            .with_config("templateFile", "LICENSE.tpl");
        task.provenance = Some(Provenance::new("templates/trellis.json".into(), "base"));

        WritePlugin.execute(&task, &h.ctx(false)).unwrap();
        assert_eq!(h.fs.contents("/work/LICENSE").as_deref(), Some("(c) ada"));
    }

    #[test]
    fn validate_rejects_two_body_fields() {
        let task = task().with_config("template", "x");
        assert!(matches!(
            WritePlugin.validate(&task),
            Err(DomainError::PluginConfiguration { .. })
        ));
    }

    #[test]
    fn diff_shows_added_lines() {
        let h = Harness::new();
        let diff = WritePlugin.diff(&task(), &h.ctx(false)).unwrap().unwrap();
        assert!(diff.contains("+# "));
        assert!(h.fs.list_files().is_empty());
    }
}
