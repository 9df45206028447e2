//! Mutually exclusive task config fields.
//!
//! When a later task definition is merged onto an earlier one, setting any
//! field of a group clears its siblings first. `write` overriding an inline
//! `content` with a `templateFile` must not end up carrying both.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use super::document::TaskType;
use super::error::DomainError;

/// Per task type, the groups of config fields that exclude each other.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConflictGroups {
    groups: BTreeMap<TaskType, Vec<Vec<String>>>,
}

impl ConflictGroups {
    /// A table with no groups; merging is then purely key-wise.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The built-in table used by the shipped task plugins.
    pub fn builtin() -> Self {
        let content = ["content", "template", "templateFile"];
        Self::empty()
            .with_group(TaskType::Write, content)
            .with_group(TaskType::Append, content)
            .with_group(TaskType::RegexReplace, ["replacement", "replacementFile"])
            .with_group(TaskType::Exec, ["command", "script"])
    }

    pub fn with_group<I, S>(mut self, task_type: TaskType, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups
            .entry(task_type)
            .or_default()
            .push(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn groups_for(&self, task_type: TaskType) -> &[Vec<String>] {
        self.groups.get(&task_type).map_or(&[], Vec::as_slice)
    }

    /// Shallow-merge `incoming` onto `base`, clearing siblings of every
    /// grouped field that `incoming` sets.
    pub fn merge_config(
        &self,
        task_type: TaskType,
        base: &Map<String, Value>,
        incoming: &Map<String, Value>,
    ) -> Map<String, Value> {
        let mut merged = base.clone();
        for group in self.groups_for(task_type) {
            if group.iter().any(|field| incoming.contains_key(field)) {
                for field in group {
                    merged.remove(field);
                }
            }
        }
        for (key, value) in incoming {
            merged.insert(key.clone(), value.clone());
        }
        merged
    }

    /// Exactly one field of `group` must be set.
    pub fn require_exactly_one<'a>(
        task: &str,
        config: &'a Map<String, Value>,
        group: &[&'a str],
    ) -> Result<&'a str, DomainError> {
        let present: Vec<&str> = group
            .iter()
            .copied()
            .filter(|field| config.get(*field).is_some_and(|v| !v.is_null()))
            .collect();

        match present.as_slice() {
            [one] => Ok(*one),
            [] => Err(DomainError::PluginConfiguration {
                task: task.to_string(),
                reason: format!("one of {} is required", group.join(", ")),
            }),
            many => Err(DomainError::PluginConfiguration {
                task: task.to_string(),
                reason: format!("{} are mutually exclusive", many.join(" and ")),
            }),
        }
    }
}
