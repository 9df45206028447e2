//! Dependency ordering for tasks.
//!
//! Depth-first, three-state traversal in declaration order. A task is
//! emitted after all of its dependencies; tasks with no relative constraint
//! keep the order they were declared in.

use std::collections::HashMap;

use tracing::debug;

use super::document::TaskDefinition;
use super::error::{CycleKind, DomainError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Indices into `tasks`, in execution order.
pub fn topological_order(tasks: &[TaskDefinition]) -> Result<Vec<usize>, DomainError> {
    let index: HashMap<&str, usize> = tasks
        .iter()
        .enumerate()
        .map(|(i, task)| (task.id.as_str(), i))
        .collect();

    let mut marks = vec![Mark::Unvisited; tasks.len()];
    let mut order = Vec::with_capacity(tasks.len());
    let mut path = Vec::new();

    for start in 0..tasks.len() {
        visit(start, tasks, &index, &mut marks, &mut path, &mut order)?;
    }

    Ok(order)
}

fn visit(
    node: usize,
    tasks: &[TaskDefinition],
    index: &HashMap<&str, usize>,
    marks: &mut [Mark],
    path: &mut Vec<usize>,
    order: &mut Vec<usize>,
) -> Result<(), DomainError> {
    match marks[node] {
        Mark::Done => return Ok(()),
        Mark::InProgress => {
            let from = path.iter().position(|&n| n == node).unwrap_or(0);
            let mut cycle: Vec<String> = path[from..]
                .iter()
                .map(|&n| tasks[n].id.clone())
                .collect();
            cycle.push(tasks[node].id.clone());
            return Err(DomainError::CircularDependency {
                kind: CycleKind::Tasks,
                cycle,
            });
        }
        Mark::Unvisited => {}
    }

    marks[node] = Mark::InProgress;
    path.push(node);

    let task = &tasks[node];
    for dependency in &task.dependencies {
        let Some(&dep) = index.get(dependency.as_str()) else {
            return Err(DomainError::TaskNotFound {
                task: task.id.clone(),
                missing: dependency.clone(),
            });
        };
        visit(dep, tasks, index, marks, path, order)?;
    }

    path.pop();
    marks[node] = Mark::Done;
    order.push(node);
    Ok(())
}

/// Sort a task list into execution order.
pub fn sort_tasks(tasks: &[TaskDefinition]) -> Result<Vec<TaskDefinition>, DomainError> {
    let order = topological_order(tasks)?;
    Ok(order.into_iter().map(|i| tasks[i].clone()).collect())
}

/// Drop dependency edges that point at tasks outside `kept`.
///
/// Used after final enablement: a dependency on a task that exists but is
/// disabled must not fail the sort. Unknown ids are left alone so the sort
/// still reports them.
pub fn prune_dependencies(
    tasks: &mut [TaskDefinition],
    kept: &[&str],
    known: &[&str],
) {
    for task in tasks.iter_mut() {
        let id = task.id.clone();
        task.dependencies.retain(|dep| {
            let keep = kept.contains(&dep.as_str()) || !known.contains(&dep.as_str());
            if !keep {
                debug!(task = %id, dependency = %dep, "Dropping dependency on disabled task");
            }
            keep
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::document::TaskType;

    fn task(id: &str, deps: &[&str]) -> TaskDefinition {
        TaskDefinition::new(id, TaskType::Exec).with_dependencies(deps.iter().copied())
    }

    fn ids(tasks: &[TaskDefinition]) -> Vec<&str> {
        tasks.iter().map(|t| t.id.as_str()).collect()
    }

    #[test]
    fn unconstrained_tasks_keep_declaration_order() {
        let tasks = vec![task("c", &[]), task("a", &[]), task("b", &[])];
        assert_eq!(ids(&sort_tasks(&tasks).unwrap()), vec!["c", "a", "b"]);
    }

    #[test]
    fn dependencies_come_first() {
        let tasks = vec![
            task("build", &["install"]),
            task("readme", &[]),
            task("install", &["init"]),
            task("init", &[]),
        ];
        assert_eq!(
            ids(&sort_tasks(&tasks).unwrap()),
            vec!["init", "install", "build", "readme"]
        );
    }

    #[test]
    fn cycle_names_the_path() {
        let tasks = vec![task("a", &["b"]), task("b", &["c"]), task("c", &["a"])];
        match sort_tasks(&tasks) {
            Err(DomainError::CircularDependency { kind, cycle }) => {
                assert_eq!(kind, CycleKind::Tasks);
                assert_eq!(cycle, vec!["a", "b", "c", "a"]);
            }
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let tasks = vec![task("a", &["a"])];
        assert!(matches!(
            sort_tasks(&tasks),
            Err(DomainError::CircularDependency { .. })
        ));
    }

    #[test]
    fn missing_dependency_is_reported() {
        let tasks = vec![task("a", &["ghost"])];
        assert_eq!(
            sort_tasks(&tasks),
            Err(DomainError::TaskNotFound {
                task: "a".into(),
                missing: "ghost".into()
            })
        );
    }

    #[test]
    fn pruning_drops_only_disabled_dependencies() {
        let mut tasks = vec![task("a", &["off", "ghost", "b"]), task("b", &[])];
        prune_dependencies(&mut tasks, &["a", "b"], &["a", "b", "off"]);
        assert_eq!(tasks[0].dependencies, vec!["ghost", "b"]);
    }
}
