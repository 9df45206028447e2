//! `delete` - remove a file or directory.

use trellis_core::{
    application::ports::{TaskContext, TaskOutcome, TaskPlugin},
    domain::{DomainError, TaskDefinition, TaskType},
    error::TrellisResult,
};

use super::support;

pub struct DeletePlugin;

impl TaskPlugin for DeletePlugin {
    fn task_type(&self) -> TaskType {
        TaskType::Delete
    }

    fn validate(&self, task: &TaskDefinition) -> Result<(), DomainError> {
        support::require(task, "path")
    }

    fn execute(&self, task: &TaskDefinition, ctx: &TaskContext<'_>) -> TrellisResult<TaskOutcome> {
        let path = support::path(task, ctx, "path")?;
        if !ctx.filesystem.exists(&path) {
            return Ok(TaskOutcome::unchanged(format!("{} already absent", path.display())));
        }
        if ctx.dry_run {
            return Ok(TaskOutcome::unchanged(format!("would delete {}", path.display())));
        }

        if ctx.filesystem.is_dir(&path) {
            ctx.filesystem.remove_dir_all(&path)?;
        } else {
            ctx.filesystem.remove_file(&path)?;
        }
        Ok(TaskOutcome::changed(format!("deleted {}", path.display())))
    }

    fn diff(&self, task: &TaskDefinition, ctx: &TaskContext<'_>) -> TrellisResult<Option<String>> {
        let path = support::path(task, ctx, "path")?;
        Ok(support::existing(ctx, &path)?.map(|old| support::unified(&path, &old, "")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::support::testing::Harness;

    #[test]
    fn missing_path_is_a_no_op() {
        let h = Harness::new();
        let task = TaskDefinition::new("rm", TaskType::Delete).with_config("path", "gone.txt");
        let outcome = DeletePlugin.execute(&task, &h.ctx(false)).unwrap();
        assert!(!outcome.changed);
    }

    #[test]
    fn removes_directories_recursively() {
        let h = Harness::new();
        h.seed("/work/tmp/a.txt", "a");
        h.seed("/work/tmp/b/c.txt", "c");
        let task = TaskDefinition::new("rm", TaskType::Delete).with_config("path", "tmp");

        DeletePlugin.execute(&task, &h.ctx(false)).unwrap();
        assert!(h.fs.list_files().is_empty());
    }
}
