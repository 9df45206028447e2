//! Per-run registries of plugins and hooks.
//!
//! Both are plain values built by the caller and passed to the orchestrator
//! by reference. There is no process-wide registration.

use std::collections::BTreeMap;

use tracing::debug;

use super::output::{LifecycleHooks, TaskOutcome, TaskPlugin};
use crate::application::ApplicationError;
use crate::domain::{ResolutionContext, TaskDefinition, TaskType};
use crate::error::{TrellisError, TrellisResult};

/// Task type → executor.
#[derive(Default)]
pub struct PluginRegistry {
    plugins: BTreeMap<TaskType, Box<dyn TaskPlugin>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plugin, replacing any earlier one for the same type.
    pub fn register(&mut self, plugin: Box<dyn TaskPlugin>) -> &mut Self {
        let task_type = plugin.task_type();
        if self.plugins.insert(task_type, plugin).is_some() {
            debug!(%task_type, "Replaced task plugin");
        }
        self
    }

    pub fn with(mut self, plugin: Box<dyn TaskPlugin>) -> Self {
        self.register(plugin);
        self
    }

    pub fn get(&self, task_type: TaskType) -> TrellisResult<&dyn TaskPlugin> {
        self.plugins
            .get(&task_type)
            .map(Box::as_ref)
            .ok_or_else(|| {
                ApplicationError::PluginNotRegistered {
                    task_type: task_type.to_string(),
                }
                .into()
            })
    }

    pub fn contains(&self, task_type: TaskType) -> bool {
        self.plugins.contains_key(&task_type)
    }

    pub fn task_types(&self) -> impl Iterator<Item = TaskType> + '_ {
        self.plugins.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

/// Ordered set of lifecycle observers.
#[derive(Default)]
pub struct HookRegistry {
    hooks: Vec<Box<dyn LifecycleHooks>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, hooks: Box<dyn LifecycleHooks>) -> &mut Self {
        self.hooks.push(hooks);
        self
    }

    pub fn with(mut self, hooks: Box<dyn LifecycleHooks>) -> Self {
        self.register(hooks);
        self
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    pub fn before_all(&self, tasks: &[TaskDefinition], ctx: &ResolutionContext) {
        for hook in &self.hooks {
            hook.before_all(tasks, ctx);
        }
    }

    pub fn before_task(&self, task: &TaskDefinition, ctx: &ResolutionContext) {
        for hook in &self.hooks {
            hook.before_task(task, ctx);
        }
    }

    pub fn after_task(&self, task: &TaskDefinition, outcome: &TaskOutcome, ctx: &ResolutionContext) {
        for hook in &self.hooks {
            hook.after_task(task, outcome, ctx);
        }
    }

    pub fn on_error(&self, task: &TaskDefinition, error: &TrellisError, ctx: &ResolutionContext) {
        for hook in &self.hooks {
            hook.on_error(task, error, ctx);
        }
    }

    pub fn after_all(&self, completed: &[String], ctx: &ResolutionContext) {
        for hook in &self.hooks {
            hook.after_all(completed, ctx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::TaskContext;

    struct Noop(TaskType);

    impl TaskPlugin for Noop {
        fn task_type(&self) -> TaskType {
            self.0
        }

        fn execute(
            &self,
            _task: &TaskDefinition,
            _ctx: &TaskContext<'_>,
        ) -> TrellisResult<TaskOutcome> {
            Ok(TaskOutcome::unchanged("noop"))
        }
    }

    #[test]
    fn lookup_by_task_type() {
        let registry = PluginRegistry::new().with(Box::new(Noop(TaskType::Exec)));
        assert!(registry.get(TaskType::Exec).is_ok());
        assert!(matches!(
            registry.get(TaskType::Write),
            Err(TrellisError::Application(
                ApplicationError::PluginNotRegistered { .. }
            ))
        ));
    }

    #[test]
    fn later_registration_replaces_earlier() {
        let mut registry = PluginRegistry::new();
        registry
            .register(Box::new(Noop(TaskType::Exec)))
            .register(Box::new(Noop(TaskType::Exec)));
        assert_eq!(registry.len(), 1);
    }
}
