//! Configuration document model.
//!
//! ```text
//! ConfigurationDocument
//! ├── name
//! ├── extends: "base.json" | ["a.json", "b.json"]
//! ├── enabled: EnabledSpec
//! ├── tasks:     [TaskDefinition]
//! ├── variables: [VariableDefinition]
//! └── prompts:   [PromptDefinition]
//! ```
//!
//! Every entity carries a [`Provenance`] filled in by the loader, and an
//! inherited `$templateEnabled` filled in by the merger when its owning
//! document is conditionally enabled.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::location::{DocumentLocation, Provenance};
use super::value_spec::{EnabledSpec, ValueSpec};

/// One configuration document, as written by a template author.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationDocument {
    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extends: Option<Extends>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<EnabledSpec>,

    #[serde(default)]
    pub tasks: Vec<TaskDefinition>,

    #[serde(default)]
    pub variables: Vec<VariableDefinition>,

    #[serde(default)]
    pub prompts: Vec<PromptDefinition>,

    /// Identity of this document; set by the loader.
    #[serde(skip)]
    pub source: Option<DocumentLocation>,
}

impl ConfigurationDocument {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Raw `extends` references, in declaration order.
    pub fn extends_targets(&self) -> Vec<&str> {
        match &self.extends {
            None => Vec::new(),
            Some(Extends::One(target)) => vec![target.as_str()],
            Some(Extends::Many(targets)) => targets.iter().map(String::as_str).collect(),
        }
    }

    /// Provenance for entities of this document.
    pub fn provenance(&self) -> Option<Provenance> {
        self.source
            .clone()
            .map(|source| Provenance::new(source, self.name.clone()))
    }

    /// Stamp provenance on every entity.
    pub fn annotate_provenance(&mut self) {
        let Some(provenance) = self.provenance() else {
            return;
        };
        for task in &mut self.tasks {
            task.provenance = Some(provenance.clone());
        }
        for variable in &mut self.variables {
            variable.provenance = Some(provenance.clone());
        }
        for prompt in &mut self.prompts {
            prompt.provenance = Some(provenance.clone());
        }
    }

    /// Human label for diagnostics.
    pub fn label(&self) -> String {
        match (&self.source, self.name.is_empty()) {
            (Some(source), _) => source.to_string(),
            (None, false) => self.name.clone(),
            (None, true) => "<anonymous>".into(),
        }
    }
}

/// One or many `extends` references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Extends {
    One(String),
    Many(Vec<String>),
}

/// Policy for redefining an id that an earlier document already defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverrideStrategy {
    /// Shallow-merge fields onto the earlier definition.
    Merge,
    /// Discard the earlier definition.
    Replace,
}

// ============================================================================
// Tasks
// ============================================================================

/// Closed set of task types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskType {
    Write,
    Append,
    Delete,
    Rename,
    RegexReplace,
    Exec,
    GitInit,
}

impl TaskType {
    pub const ALL: [TaskType; 7] = [
        TaskType::Write,
        TaskType::Append,
        TaskType::Delete,
        TaskType::Rename,
        TaskType::RegexReplace,
        TaskType::Exec,
        TaskType::GitInit,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Write => "write",
            Self::Append => "append",
            Self::Delete => "delete",
            Self::Rename => "rename",
            Self::RegexReplace => "regex-replace",
            Self::Exec => "exec",
            Self::GitInit => "git-init",
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A unit of work executed by a task plugin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDefinition {
    pub id: String,

    #[serde(rename = "type")]
    pub task_type: TaskType,

    /// Type-specific payload, interpreted by the plugin.
    #[serde(default)]
    pub config: Map<String, Value>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<EnabledSpec>,

    /// `None` means required.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(rename = "override", default, skip_serializing_if = "Option::is_none")]
    pub override_strategy: Option<OverrideStrategy>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provenance: Option<Provenance>,

    /// Enablement inherited from the owning document.
    #[serde(
        rename = "$templateEnabled",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub template_enabled: Option<EnabledSpec>,
}

impl TaskDefinition {
    pub fn new(id: impl Into<String>, task_type: TaskType) -> Self {
        Self {
            id: id.into(),
            task_type,
            config: Map::new(),
            dependencies: Vec::new(),
            enabled: None,
            required: None,
            description: None,
            override_strategy: None,
            provenance: None,
            template_enabled: None,
        }
    }

    pub fn with_config(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }

    pub fn with_dependencies<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = deps.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_enabled(mut self, enabled: EnabledSpec) -> Self {
        self.enabled = Some(enabled);
        self
    }

    pub fn with_override(mut self, strategy: OverrideStrategy) -> Self {
        self.override_strategy = Some(strategy);
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = Some(false);
        self
    }

    pub fn is_required(&self) -> bool {
        self.required.unwrap_or(true)
    }

    /// String-valued config field.
    pub fn config_str(&self, key: &str) -> Option<&str> {
        self.config.get(key).and_then(Value::as_str)
    }

    /// Boolean config field with a default.
    pub fn config_bool(&self, key: &str, default: bool) -> bool {
        self.config
            .get(key)
            .and_then(Value::as_bool)
            .unwrap_or(default)
    }

    pub fn origin(&self) -> String {
        self.provenance
            .as_ref()
            .map_or_else(|| "<inline>".to_string(), ToString::to_string)
    }
}

// ============================================================================
// Variables and prompts
// ============================================================================

/// A named value resolved into the context before tasks run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableDefinition {
    pub id: String,

    pub value: ValueSpec,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(rename = "override", default, skip_serializing_if = "Option::is_none")]
    pub override_strategy: Option<OverrideStrategy>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provenance: Option<Provenance>,

    #[serde(
        rename = "$templateEnabled",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub template_enabled: Option<EnabledSpec>,
}

impl VariableDefinition {
    pub fn new(id: impl Into<String>, value: ValueSpec) -> Self {
        Self {
            id: id.into(),
            value,
            description: None,
            override_strategy: None,
            provenance: None,
            template_enabled: None,
        }
    }

    pub fn with_override(mut self, strategy: OverrideStrategy) -> Self {
        self.override_strategy = Some(strategy);
        self
    }

    pub fn origin(&self) -> String {
        self.provenance
            .as_ref()
            .map_or_else(|| "<inline>".to_string(), ToString::to_string)
    }
}

/// How a prompt is presented and how its answer is typed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptKind {
    #[default]
    #[serde(alias = "input")]
    Text,
    Confirm,
    #[serde(alias = "list")]
    Select,
    Number,
    Password,
}

/// A question asked of the user; the answer lands in the context under `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptDefinition {
    pub id: String,

    pub message: String,

    #[serde(rename = "type", default)]
    pub kind: PromptKind,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<ValueSpec>,

    /// Asked once per run and shared by every document.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub global: bool,

    #[serde(rename = "override", default, skip_serializing_if = "Option::is_none")]
    pub override_strategy: Option<OverrideStrategy>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provenance: Option<Provenance>,

    #[serde(
        rename = "$templateEnabled",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub template_enabled: Option<EnabledSpec>,
}

impl PromptDefinition {
    pub fn new(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            message: message.into(),
            kind: PromptKind::Text,
            choices: Vec::new(),
            default: None,
            global: false,
            override_strategy: None,
            provenance: None,
            template_enabled: None,
        }
    }

    pub fn with_default(mut self, default: ValueSpec) -> Self {
        self.default = Some(default);
        self
    }

    pub fn with_kind(mut self, kind: PromptKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn global(mut self) -> Self {
        self.global = true;
        self
    }

    pub fn origin(&self) -> String {
        self.provenance
            .as_ref()
            .map_or_else(|| "<inline>".to_string(), ToString::to_string)
    }
}
