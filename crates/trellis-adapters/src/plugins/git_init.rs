//! `git-init` - initialise a repository unless one already exists.

use trellis_core::{
    application::ports::{TaskContext, TaskOutcome, TaskPlugin},
    domain::{TaskDefinition, TaskType},
    error::TrellisResult,
};

use super::support;

pub struct GitInitPlugin;

fn valid_branch(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/'))
}

impl TaskPlugin for GitInitPlugin {
    fn task_type(&self) -> TaskType {
        TaskType::GitInit
    }

    fn execute(&self, task: &TaskDefinition, ctx: &TaskContext<'_>) -> TrellisResult<TaskOutcome> {
        let dir = match task.config_str("path") {
            Some(_) => support::path(task, ctx, "path")?,
            None => ctx.cwd.to_path_buf(),
        };
        if ctx.filesystem.exists(&dir.join(".git")) {
            return Ok(TaskOutcome::unchanged(format!(
                "{} is already a repository",
                dir.display()
            )));
        }

        let mut command = String::from("git init");
        if task.config_str("initialBranch").is_some() {
            let branch = support::rendered(task, ctx, "initialBranch")?;
            if !valid_branch(&branch) {
                return Err(support::failed(task, format!("invalid branch name '{branch}'")));
            }
            command.push_str(" --initial-branch=");
            command.push_str(&branch);
        }
        if ctx.dry_run {
            return Ok(TaskOutcome::unchanged(format!("would run `{command}`")));
        }

        ctx.filesystem.create_dir_all(&dir)?;
        let output = ctx.runner.run_shell(&command, Some(&dir))?;
        if !output.success() {
            return Err(support::failed(task, output.stderr.trim().to_string()));
        }
        Ok(TaskOutcome::changed(format!(
            "initialised repository in {}",
            dir.display()
        )))
    }
}
