//! Merging resolved documents into one.
//!
//! Documents are folded in resolution order (ancestors first). Per entity
//! kind, the first definition of an id establishes the entry; a later one
//! must say how it relates to it:
//!
//! | later `override` | result                                           |
//! |------------------|--------------------------------------------------|
//! | *(none)*         | fatal `DuplicateId` naming both provenances       |
//! | `replace`        | the later definition, verbatim                    |
//! | `merge`          | shallow field merge, see [`MergeEntry`]           |

use std::collections::HashMap;

use tracing::{debug, instrument};

use super::extends_resolver::ResolvedDocument;
use crate::domain::{
    ConfigurationDocument, ConflictGroups, DomainError, EnabledSpec, IdValidator,
    OverrideStrategy, PromptDefinition, TaskDefinition, VariableDefinition,
};
use crate::error::TrellisResult;

/// An entity that participates in id-keyed merging.
pub trait MergeEntry: Clone {
    const KIND: &'static str;

    fn id(&self) -> &str;

    fn override_strategy(&self) -> Option<OverrideStrategy>;

    fn origin(&self) -> String;

    fn set_template_enabled(&mut self, spec: EnabledSpec);

    /// Merge `later` onto `self` field by field.
    fn merge_from(&mut self, later: Self, groups: &ConflictGroups);
}

impl MergeEntry for TaskDefinition {
    const KIND: &'static str = "task";

    fn id(&self) -> &str {
        &self.id
    }

    fn override_strategy(&self) -> Option<OverrideStrategy> {
        self.override_strategy
    }

    fn origin(&self) -> String {
        TaskDefinition::origin(self)
    }

    fn set_template_enabled(&mut self, spec: EnabledSpec) {
        self.template_enabled = Some(spec);
    }

    /// Config is merged key-wise with conflict-group clearing, dependencies
    /// are unioned, optional fields fall back to the earlier value.
    fn merge_from(&mut self, later: Self, groups: &ConflictGroups) {
        self.config = groups.merge_config(later.task_type, &self.config, &later.config);
        self.task_type = later.task_type;
        for dependency in later.dependencies {
            if !self.dependencies.contains(&dependency) {
                self.dependencies.push(dependency);
            }
        }
        self.enabled = later.enabled.or(self.enabled.take());
        self.required = later.required.or(self.required);
        self.description = later.description.or(self.description.take());
        self.override_strategy = later.override_strategy;
        self.provenance = later.provenance.or(self.provenance.take());
        self.template_enabled = later.template_enabled.or(self.template_enabled.take());
    }
}

impl MergeEntry for VariableDefinition {
    const KIND: &'static str = "variable";

    fn id(&self) -> &str {
        &self.id
    }

    fn override_strategy(&self) -> Option<OverrideStrategy> {
        self.override_strategy
    }

    fn origin(&self) -> String {
        VariableDefinition::origin(self)
    }

    fn set_template_enabled(&mut self, spec: EnabledSpec) {
        self.template_enabled = Some(spec);
    }

    fn merge_from(&mut self, later: Self, _groups: &ConflictGroups) {
        self.value = later.value;
        self.description = later.description.or(self.description.take());
        self.override_strategy = later.override_strategy;
        self.provenance = later.provenance.or(self.provenance.take());
        self.template_enabled = later.template_enabled.or(self.template_enabled.take());
    }
}

impl MergeEntry for PromptDefinition {
    const KIND: &'static str = "prompt";

    fn id(&self) -> &str {
        &self.id
    }

    fn override_strategy(&self) -> Option<OverrideStrategy> {
        self.override_strategy
    }

    fn origin(&self) -> String {
        PromptDefinition::origin(self)
    }

    fn set_template_enabled(&mut self, spec: EnabledSpec) {
        self.template_enabled = Some(spec);
    }

    fn merge_from(&mut self, later: Self, _groups: &ConflictGroups) {
        self.message = later.message;
        self.kind = later.kind;
        if !later.choices.is_empty() {
            self.choices = later.choices;
        }
        self.default = later.default.or(self.default.take());
        self.global |= later.global;
        self.override_strategy = later.override_strategy;
        self.provenance = later.provenance.or(self.provenance.take());
        self.template_enabled = later.template_enabled.or(self.template_enabled.take());
    }
}

/// Id-keyed accumulator for one entity kind.
struct Entries<T> {
    items: Vec<T>,
    index: HashMap<String, usize>,
}

impl<T: MergeEntry> Entries<T> {
    fn new() -> Self {
        Self {
            items: Vec::new(),
            index: HashMap::new(),
        }
    }

    fn get(&self, id: &str) -> Option<&T> {
        self.index.get(id).map(|&slot| &self.items[slot])
    }

    fn add(&mut self, incoming: T, groups: &ConflictGroups) -> Result<(), DomainError> {
        let Some(&slot) = self.index.get(incoming.id()) else {
            self.index.insert(incoming.id().to_string(), self.items.len());
            self.items.push(incoming);
            return Ok(());
        };

        match incoming.override_strategy() {
            None => Err(DomainError::DuplicateId {
                kind: T::KIND,
                id: incoming.id().to_string(),
                first: self.items[slot].origin(),
                second: incoming.origin(),
            }),
            Some(OverrideStrategy::Replace) => {
                debug!(kind = T::KIND, id = incoming.id(), "Replacing definition");
                self.items[slot] = incoming;
                Ok(())
            }
            Some(OverrideStrategy::Merge) => {
                debug!(kind = T::KIND, id = incoming.id(), "Merging definition");
                self.items[slot].merge_from(incoming, groups);
                Ok(())
            }
        }
    }
}

/// Folds resolved documents into a single merged document.
#[derive(Debug, Clone, Default)]
pub struct ConfigMerger {
    groups: ConflictGroups,
}

impl ConfigMerger {
    pub fn new(groups: ConflictGroups) -> Self {
        Self { groups }
    }

    /// Merger with the built-in conflict groups.
    pub fn builtin() -> Self {
        Self::new(ConflictGroups::builtin())
    }

    pub fn groups(&self) -> &ConflictGroups {
        &self.groups
    }

    #[instrument(skip_all, fields(documents = documents.len()))]
    pub fn merge(&self, documents: &[ResolvedDocument]) -> TrellisResult<ConfigurationDocument> {
        let mut tasks = Entries::new();
        let mut variables = Entries::new();
        let mut prompts = Entries::new();

        for resolved in documents {
            let spec = resolved.effective_enabled.as_ref();
            if spec.is_some_and(EnabledSpec::is_literal_false) {
                debug!(document = %resolved.document.label(), "Skipping disabled document");
                continue;
            }
            // Literal `true` needs no run-time check.
            let stamp = spec.filter(|s| !s.is_literal()).cloned();

            for task in &resolved.document.tasks {
                tasks.add(stamped(task, &stamp), &self.groups)?;
            }
            for variable in &resolved.document.variables {
                variables.add(stamped(variable, &stamp), &self.groups)?;
            }
            for prompt in &resolved.document.prompts {
                prompts.add(stamped(prompt, &stamp), &self.groups)?;
            }
        }

        let root = documents.last();
        let merged = ConfigurationDocument {
            name: root.map(|r| r.document.name.clone()).unwrap_or_default(),
            extends: None,
            enabled: root.and_then(|r| r.effective_enabled.clone()),
            tasks: tasks.items,
            variables: variables.items,
            prompts: prompts.items,
            source: root.and_then(|r| r.document.source.clone()),
        };

        IdValidator::validate_merged(&merged)?;
        debug!(
            tasks = merged.tasks.len(),
            variables = merged.variables.len(),
            prompts = merged.prompts.len(),
            "Merged documents"
        );
        Ok(merged)
    }

    /// Pool task lists from independently merged documents, with the same
    /// override rules as within one chain.
    ///
    /// Roots that share an ancestor each carry that ancestor's tasks. A task
    /// already pooled from the same document is the same task and is kept
    /// once; the first copy wins.
    pub fn pool_tasks<I>(&self, lists: I) -> TrellisResult<Vec<TaskDefinition>>
    where
        I: IntoIterator<Item = Vec<TaskDefinition>>,
    {
        let mut tasks: Entries<TaskDefinition> = Entries::new();
        for list in lists {
            for task in list {
                if let Some(existing) = tasks.get(&task.id) {
                    if existing.provenance.is_some() && existing.provenance == task.provenance {
                        debug!(id = %task.id, origin = %task.origin(), "Task already pooled");
                        continue;
                    }
                }
                tasks.add(task, &self.groups)?;
            }
        }
        Ok(tasks.items)
    }
}

fn stamped<T: MergeEntry>(entry: &T, stamp: &Option<EnabledSpec>) -> T {
    let mut entry = entry.clone();
    if let Some(spec) = stamp {
        entry.set_template_enabled(spec.clone());
    }
    entry
}
