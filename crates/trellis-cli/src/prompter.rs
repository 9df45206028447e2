//! Terminal prompts.
//!
//! `DialoguerPrompter` asks on the terminal and only exists with the
//! `interactive` feature. [`choose`] picks it when asking is possible and
//! falls back to the adapters' `ScriptedPrompter` otherwise.

use std::io::IsTerminal as _;

use tracing::debug;
use trellis_adapters::ScriptedPrompter;
use trellis_core::application::PromptCollector;

/// The prompter for this run.
///
/// Terminal prompts need the `interactive` feature, a TTY on stdin, no
/// `--yes`, and `prompts.interactive` left on.
pub fn choose(assume_yes: bool, allowed_by_settings: bool) -> Box<dyn PromptCollector> {
    let wanted = !assume_yes && allowed_by_settings && std::io::stdin().is_terminal();
    if wanted {
        if let Some(prompter) = terminal() {
            return prompter;
        }
    }
    debug!(assume_yes, allowed_by_settings, "Prompts answered from defaults");
    Box::new(ScriptedPrompter::default())
}

#[cfg(feature = "interactive")]
fn terminal() -> Option<Box<dyn PromptCollector>> {
    Some(Box::new(interactive::DialoguerPrompter::new()))
}

#[cfg(not(feature = "interactive"))]
fn terminal() -> Option<Box<dyn PromptCollector>> {
    tracing::warn!("Built without the 'interactive' feature; using prompt defaults");
    None
}

#[cfg(feature = "interactive")]
mod interactive {
    use dialoguer::{Confirm, FuzzySelect, Input, Password, Select, theme::ColorfulTheme};
    use serde_json::Value;
    use trellis_core::{
        application::{ApplicationError, PromptCollector},
        domain::{PromptDefinition, PromptKind, stringify, truthy},
        error::TrellisResult,
    };

    /// Longer choice lists get a fuzzy filter.
    const FUZZY_THRESHOLD: usize = 8;

    #[derive(Default)]
    pub struct DialoguerPrompter {
        theme: ColorfulTheme,
    }

    impl DialoguerPrompter {
        pub fn new() -> Self {
            Self::default()
        }

        fn text(&self, prompt: &PromptDefinition, default: Option<&Value>) -> dialoguer::Result<Value> {
            let mut input = Input::<String>::with_theme(&self.theme).with_prompt(&prompt.message);
            if let Some(default) = default {
                input = input.default(stringify(default));
            }
            input.interact_text().map(Value::String)
        }

        fn number(&self, prompt: &PromptDefinition, default: Option<&Value>) -> dialoguer::Result<Value> {
            let mut input = Input::<f64>::with_theme(&self.theme).with_prompt(&prompt.message);
            if let Some(default) = default.and_then(Value::as_f64) {
                input = input.default(default);
            }
            input.interact_text().map(number_value)
        }

        fn confirm(&self, prompt: &PromptDefinition, default: Option<&Value>) -> dialoguer::Result<Value> {
            Confirm::with_theme(&self.theme)
                .with_prompt(&prompt.message)
                .default(truthy(default))
                .interact()
                .map(Value::Bool)
        }

        fn select(&self, prompt: &PromptDefinition, default: Option<&Value>) -> dialoguer::Result<Value> {
            let initial = default
                .map(stringify)
                .and_then(|d| prompt.choices.iter().position(|c| *c == d))
                .unwrap_or(0);

            let index = if prompt.choices.len() >= FUZZY_THRESHOLD {
                FuzzySelect::with_theme(&self.theme)
                    .with_prompt(&prompt.message)
                    .items(&prompt.choices)
                    .default(initial)
                    .interact()?
            } else {
                Select::with_theme(&self.theme)
                    .with_prompt(&prompt.message)
                    .items(&prompt.choices)
                    .default(initial)
                    .interact()?
            };
            Ok(Value::String(prompt.choices[index].clone()))
        }

        fn password(&self, prompt: &PromptDefinition) -> dialoguer::Result<Value> {
            Password::with_theme(&self.theme)
                .with_prompt(&prompt.message)
                .interact()
                .map(Value::String)
        }
    }

    impl PromptCollector for DialoguerPrompter {
        fn ask(&self, prompt: &PromptDefinition, default: Option<&Value>) -> TrellisResult<Value> {
            let answer = match prompt.kind {
                PromptKind::Select if !prompt.choices.is_empty() => self.select(prompt, default),
                PromptKind::Select | PromptKind::Text => self.text(prompt, default),
                PromptKind::Number => self.number(prompt, default),
                PromptKind::Confirm => self.confirm(prompt, default),
                PromptKind::Password => self.password(prompt),
            };
            answer.map_err(|e| {
                ApplicationError::PromptFailed {
                    prompt: prompt.id.clone(),
                    reason: e.to_string(),
                }
                .into()
            })
        }
    }

    /// Whole numbers stay integers in the context.
    pub(super) fn number_value(n: f64) -> Value {
        if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
            Value::from(n as i64)
        } else {
            serde_json::Number::from_f64(n).map_or(Value::Null, Value::Number)
        }
    }
}
