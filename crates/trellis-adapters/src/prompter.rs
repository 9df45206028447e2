//! Non-interactive prompt collection.

use serde_json::{Map, Value};
use tracing::debug;
use trellis_core::{
    application::{ApplicationError, ports::PromptCollector},
    domain::{PromptDefinition, PromptKind},
    error::TrellisResult,
};

/// Answers from a fixed map, falling back to each prompt's default.
///
/// A prompt with neither fails; confirms default to `false`.
#[derive(Debug, Clone, Default)]
pub struct ScriptedPrompter {
    answers: Map<String, Value>,
}

impl ScriptedPrompter {
    pub fn new(answers: Map<String, Value>) -> Self {
        Self { answers }
    }

    pub fn with(mut self, id: impl Into<String>, answer: impl Into<Value>) -> Self {
        self.answers.insert(id.into(), answer.into());
        self
    }
}

impl PromptCollector for ScriptedPrompter {
    fn ask(&self, prompt: &PromptDefinition, default: Option<&Value>) -> TrellisResult<Value> {
        if let Some(answer) = self.answers.get(&prompt.id) {
            return Ok(answer.clone());
        }
        if let Some(default) = default {
            debug!(id = %prompt.id, "Accepting default answer");
            return Ok(default.clone());
        }
        match prompt.kind {
            PromptKind::Confirm => Ok(Value::Bool(false)),
            PromptKind::Select => prompt
                .choices
                .first()
                .map(|choice| Value::String(choice.clone()))
                .ok_or_else(|| no_answer(prompt)),
            _ => Err(no_answer(prompt)),
        }
    }
}

fn no_answer(prompt: &PromptDefinition) -> trellis_core::error::TrellisError {
    ApplicationError::PromptFailed {
        prompt: prompt.id.clone(),
        reason: "no answer supplied and no default (pass --answer id=value)".into(),
    }
    .into()
}
