//! Typed value descriptions and enablement predicates.
//!
//! Both types accept several wire shapes and normalise them into one enum,
//! so the rest of the crate never has to look at raw JSON.
//!
//! ```text
//! ValueSpec                               EnabledSpec
//! ├── "literal" / 42 / true / {..}        ├── true | false
//! ├── {"type":"static","value":..}        ├── "env == 'prod'"
//! ├── {"type":"interpolate","value":..}   ├── {"type":"condition","value":..}
//! ├── {"type":"conditional",..}           ├── {"type":"exec","value":..}
//! ├── {"type":"exec","value":..}          ├── {"condition":..}
//! └── {"type":"exec-file","file":..}      └── {"exec":..}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ============================================================================
// ValueSpec
// ============================================================================

/// Description of a value that is resolved against a context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawValueSpec", into = "RawValueSpec")]
pub enum ValueSpec {
    /// Used unchanged.
    Static(Value),
    /// `{{dotted.path}}` placeholders substituted from the context.
    Interpolate(String),
    /// Condition picks a branch; branches are themselves value specs.
    Conditional {
        condition: String,
        if_true: Box<ValueSpec>,
        if_false: Option<Box<ValueSpec>>,
    },
    /// Shell command whose trimmed stdout becomes the value.
    Exec(String),
    /// External script invocation.
    ExecFile(ExecFileSpec),
}

/// Script reference for [`ValueSpec::ExecFile`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExecFileSpec {
    /// Local path (relative to the owning document) or URL.
    #[serde(alias = "value")]
    pub file: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    /// Passed as `--key value` after the positional args.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub parameters: Map<String, Value>,
}

impl ValueSpec {
    pub fn literal(value: impl Into<Value>) -> Self {
        Self::Static(value.into())
    }

    pub fn interpolate(template: impl Into<String>) -> Self {
        Self::Interpolate(template.into())
    }

    pub fn conditional(
        condition: impl Into<String>,
        if_true: ValueSpec,
        if_false: Option<ValueSpec>,
    ) -> Self {
        Self::Conditional {
            condition: condition.into(),
            if_true: Box::new(if_true),
            if_false: if_false.map(Box::new),
        }
    }

    pub fn exec(command: impl Into<String>) -> Self {
        Self::Exec(command.into())
    }

    /// True for `conditional` at the top level. Such variables are resolved
    /// again once prompt answers exist.
    pub fn is_conditional(&self) -> bool {
        matches!(self, Self::Conditional { .. })
    }

    /// True when resolving this spec spawns an external process.
    pub fn is_external(&self) -> bool {
        matches!(self, Self::Exec(_) | Self::ExecFile(_))
    }
}

impl From<Value> for ValueSpec {
    fn from(value: Value) -> Self {
        RawValueSpec::Literal(value).into()
    }
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
enum TaggedValue {
    Static {
        value: Value,
    },
    Interpolate {
        value: String,
    },
    Conditional {
        condition: String,
        #[serde(rename = "ifTrue")]
        if_true: Box<ValueSpec>,
        #[serde(rename = "ifFalse", default, skip_serializing_if = "Option::is_none")]
        if_false: Option<Box<ValueSpec>>,
    },
    Exec {
        #[serde(alias = "command")]
        value: String,
    },
    ExecFile(ExecFileSpec),
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawValueSpec {
    Tagged(TaggedValue),
    Literal(Value),
}

impl From<RawValueSpec> for ValueSpec {
    fn from(raw: RawValueSpec) -> Self {
        match raw {
            RawValueSpec::Literal(value) => Self::Static(value),
            RawValueSpec::Tagged(tagged) => match tagged {
                TaggedValue::Static { value } => Self::Static(value),
                TaggedValue::Interpolate { value } => Self::Interpolate(value),
                TaggedValue::Conditional {
                    condition,
                    if_true,
                    if_false,
                } => Self::Conditional {
                    condition,
                    if_true,
                    if_false,
                },
                TaggedValue::Exec { value } => Self::Exec(value),
                TaggedValue::ExecFile(spec) => Self::ExecFile(spec),
            },
        }
    }
}

impl From<ValueSpec> for RawValueSpec {
    fn from(spec: ValueSpec) -> Self {
        match spec {
            // An object literal that carries its own "type" key must be
            // wrapped, otherwise it would read back as a tagged spec.
            ValueSpec::Static(Value::Object(map)) if map.contains_key("type") => {
                RawValueSpec::Tagged(TaggedValue::Static {
                    value: Value::Object(map),
                })
            }
            ValueSpec::Static(value) => RawValueSpec::Literal(value),
            ValueSpec::Interpolate(value) => {
                RawValueSpec::Tagged(TaggedValue::Interpolate { value })
            }
            ValueSpec::Conditional {
                condition,
                if_true,
                if_false,
            } => RawValueSpec::Tagged(TaggedValue::Conditional {
                condition,
                if_true,
                if_false,
            }),
            ValueSpec::Exec(value) => RawValueSpec::Tagged(TaggedValue::Exec { value }),
            ValueSpec::ExecFile(spec) => RawValueSpec::Tagged(TaggedValue::ExecFile(spec)),
        }
    }
}

// ============================================================================
// EnabledSpec
// ============================================================================

/// Predicate gating whether a document or task contributes to a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawEnabledSpec", into = "RawEnabledSpec")]
pub enum EnabledSpec {
    Literal(bool),
    /// Expression evaluated against the resolution context.
    Condition(String),
    /// Shell command; enabled when it succeeds with truthy output.
    Exec(String),
}

impl EnabledSpec {
    pub fn condition(expression: impl Into<String>) -> Self {
        Self::Condition(expression.into())
    }

    pub fn is_literal_false(&self) -> bool {
        matches!(self, Self::Literal(false))
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Self::Literal(_))
    }
}

impl From<bool> for EnabledSpec {
    fn from(value: bool) -> Self {
        Self::Literal(value)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum EnabledKind {
    Condition,
    Exec,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawEnabledSpec {
    Literal(bool),
    Expression(String),
    Typed {
        #[serde(rename = "type")]
        kind: EnabledKind,
        value: String,
    },
    ConditionShorthand {
        condition: String,
    },
    ExecShorthand {
        exec: String,
    },
}

impl From<RawEnabledSpec> for EnabledSpec {
    fn from(raw: RawEnabledSpec) -> Self {
        match raw {
            RawEnabledSpec::Literal(value) => Self::Literal(value),
            RawEnabledSpec::Expression(expr) => Self::Condition(expr),
            RawEnabledSpec::Typed {
                kind: EnabledKind::Condition,
                value,
            } => Self::Condition(value),
            RawEnabledSpec::Typed {
                kind: EnabledKind::Exec,
                value,
            } => Self::Exec(value),
            RawEnabledSpec::ConditionShorthand { condition } => Self::Condition(condition),
            RawEnabledSpec::ExecShorthand { exec } => Self::Exec(exec),
        }
    }
}

impl From<EnabledSpec> for RawEnabledSpec {
    fn from(spec: EnabledSpec) -> Self {
        match spec {
            EnabledSpec::Literal(value) => Self::Literal(value),
            EnabledSpec::Condition(value) => Self::Typed {
                kind: EnabledKind::Condition,
                value,
            },
            EnabledSpec::Exec(value) => Self::Typed {
                kind: EnabledKind::Exec,
                value,
            },
        }
    }
}
