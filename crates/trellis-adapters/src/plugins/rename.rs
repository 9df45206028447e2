//! `rename` - move a file.

use trellis_core::{
    application::ports::{TaskContext, TaskOutcome, TaskPlugin},
    domain::{DomainError, TaskDefinition, TaskType},
    error::TrellisResult,
};

use super::support;

pub struct RenamePlugin;

impl TaskPlugin for RenamePlugin {
    fn task_type(&self) -> TaskType {
        TaskType::Rename
    }

    fn validate(&self, task: &TaskDefinition) -> Result<(), DomainError> {
        support::require(task, "from")?;
        support::require(task, "to")
    }

    fn execute(&self, task: &TaskDefinition, ctx: &TaskContext<'_>) -> TrellisResult<TaskOutcome> {
        let from = support::path(task, ctx, "from")?;
        let to = support::path(task, ctx, "to")?;

        if from == to {
            return Ok(TaskOutcome::unchanged("source and target are the same"));
        }
        if !ctx.filesystem.exists(&from) {
            return Err(support::failed(
                task,
                format!("{} does not exist", from.display()),
            ));
        }
        if ctx.filesystem.exists(&to) && !ctx.force {
            return Err(support::failed(
                task,
                format!("{} already exists (use --force)", to.display()),
            ));
        }
        if ctx.dry_run {
            return Ok(TaskOutcome::unchanged(format!(
                "would rename {} to {}",
                from.display(),
                to.display()
            )));
        }

        ctx.filesystem.rename(&from, &to)?;
        Ok(TaskOutcome::changed(format!(
            "renamed {} to {}",
            from.display(),
            to.display()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::support::testing::Harness;

    fn task() -> TaskDefinition {
        TaskDefinition::new("mv", TaskType::Rename)
            .with_config("from", "{{name}}.tmp")
            .with_config("to", "src/{{name}}.rs")
    }

    #[test]
    fn renames_with_rendered_paths() {
        let mut h = Harness::new();
        h.context.insert("name", "lib");
        h.seed("/work/lib.tmp", "x");

        RenamePlugin.execute(&task(), &h.ctx(false)).unwrap();
        assert_eq!(h.fs.contents("/work/src/lib.rs").as_deref(), Some("x"));
    }

    #[test]
    fn refuses_to_clobber_without_force() {
        let mut h = Harness::new();
        h.context.insert("name", "lib");
        h.seed("/work/lib.tmp", "new");
        h.seed("/work/src/lib.rs", "old");

        assert!(RenamePlugin.execute(&task(), &h.ctx(false)).is_err());
        RenamePlugin.execute(&task(), &h.ctx(true)).unwrap();
        assert_eq!(h.fs.contents("/work/src/lib.rs").as_deref(), Some("new"));
    }
}
