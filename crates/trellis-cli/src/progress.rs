//! Task progress on stderr, driven by the orchestrator's lifecycle hooks.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use trellis_core::{
    application::{LifecycleHooks, ports::TaskOutcome},
    domain::{ResolutionContext, TaskDefinition},
    error::TrellisError,
};

const TEMPLATE: &str = "{spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} {msg}";

pub struct ProgressHooks {
    bar: ProgressBar,
}

impl ProgressHooks {
    pub fn stderr() -> Self {
        Self::with_target(ProgressDrawTarget::stderr())
    }

    #[cfg(test)]
    fn hidden() -> Self {
        Self::with_target(ProgressDrawTarget::hidden())
    }

    fn with_target(target: ProgressDrawTarget) -> Self {
        let style = ProgressStyle::with_template(TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");
        let bar = ProgressBar::with_draw_target(Some(0), target);
        bar.set_style(style);
        Self { bar }
    }
}

impl LifecycleHooks for ProgressHooks {
    fn before_all(&self, tasks: &[TaskDefinition], _ctx: &ResolutionContext) {
        self.bar.set_length(tasks.len() as u64);
        self.bar.set_position(0);
    }

    fn before_task(&self, task: &TaskDefinition, _ctx: &ResolutionContext) {
        self.bar.set_message(format!("{} ({})", task.id, task.task_type));
    }

    fn after_task(&self, _task: &TaskDefinition, _outcome: &TaskOutcome, _ctx: &ResolutionContext) {
        self.bar.inc(1);
    }

    fn on_error(&self, task: &TaskDefinition, error: &TrellisError, _ctx: &ResolutionContext) {
        self.bar.println(format!("  task '{}' failed: {error}", task.id));
        if task.is_required() {
            self.bar.abandon_with_message(format!("stopped at '{}'", task.id));
        } else {
            self.bar.inc(1);
        }
    }

    fn after_all(&self, _completed: &[String], _ctx: &ResolutionContext) {
        self.bar.finish_and_clear();
    }
}
