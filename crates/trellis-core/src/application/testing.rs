//! In-crate test doubles for the ports.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde_json::Value;

use crate::application::{
    ApplicationError,
    ports::{CommandOutput, CommandRunner, DocumentFetcher, PromptCollector, ScriptSource},
};
use crate::domain::{DocumentLocation, PromptDefinition};
use crate::error::TrellisResult;

/// Fixed documents keyed by normalised location; counts fetches.
#[derive(Default)]
pub struct StaticFetcher {
    documents: HashMap<DocumentLocation, String>,
    fetches: Mutex<HashMap<DocumentLocation, usize>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, location: &str, text: &str) -> Self {
        self.documents
            .insert(DocumentLocation::parse(location), text.to_string());
        self
    }

    pub fn fetch_count(&self, location: &str) -> usize {
        self.fetches
            .lock()
            .unwrap()
            .get(&DocumentLocation::parse(location))
            .copied()
            .unwrap_or(0)
    }
}

impl DocumentFetcher for StaticFetcher {
    fn fetch(&self, location: &DocumentLocation) -> TrellisResult<String> {
        *self
            .fetches
            .lock()
            .unwrap()
            .entry(location.clone())
            .or_default() += 1;
        self.documents.get(location).cloned().ok_or_else(|| {
            ApplicationError::ConfigurationNotFound {
                location: location.to_string(),
            }
            .into()
        })
    }
}

/// Canned command results.
///
/// Shell commands are keyed by their text; scripts by `script:<path>` or
/// `inline:<extension>`. Unknown commands exit 127.
#[derive(Default)]
pub struct FakeRunner {
    outputs: HashMap<String, CommandOutput>,
    calls: Mutex<Vec<String>>,
    dirs: Mutex<Vec<Option<PathBuf>>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stdout(mut self, key: &str, stdout: &str) -> Self {
        self.outputs.insert(
            key.to_string(),
            CommandOutput {
                status: Some(0),
                stdout: stdout.to_string(),
                stderr: String::new(),
            },
        );
        self
    }

    pub fn failing(mut self, key: &str) -> Self {
        self.outputs.insert(
            key.to_string(),
            CommandOutput {
                status: Some(1),
                stdout: String::new(),
                stderr: "failed".into(),
            },
        );
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Working directory of every call, in call order.
    pub fn dirs(&self) -> Vec<Option<PathBuf>> {
        self.dirs.lock().unwrap().clone()
    }

    fn answer(&self, key: String, args: &[String], cwd: Option<&Path>) -> TrellisResult<CommandOutput> {
        self.dirs.lock().unwrap().push(cwd.map(Path::to_path_buf));
        let mut call = key.clone();
        for arg in args {
            call.push(' ');
            call.push_str(arg);
        }
        self.calls.lock().unwrap().push(call);
        Ok(self.outputs.get(&key).cloned().unwrap_or(CommandOutput {
            status: Some(127),
            stdout: String::new(),
            stderr: "not found".into(),
        }))
    }
}

impl CommandRunner for FakeRunner {
    fn run_shell(&self, command: &str, cwd: Option<&Path>) -> TrellisResult<CommandOutput> {
        self.answer(command.to_string(), &[], cwd)
    }

    fn run_script(
        &self,
        script: &ScriptSource,
        args: &[String],
        cwd: Option<&Path>,
    ) -> TrellisResult<CommandOutput> {
        let key = match script {
            ScriptSource::Path(path) => format!("script:{}", path.display()),
            ScriptSource::Inline { extension, .. } => {
                format!("inline:{}", extension.as_deref().unwrap_or(""))
            }
        };
        self.answer(key, args, cwd)
    }
}

/// Answers by prompt id, falling back to the resolved default.
#[derive(Default)]
pub struct ScriptedAnswers {
    answers: HashMap<String, Value>,
    asked: Mutex<Vec<String>>,
}

impl ScriptedAnswers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer(mut self, id: &str, value: Value) -> Self {
        self.answers.insert(id.to_string(), value);
        self
    }

    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().unwrap().clone()
    }
}

impl PromptCollector for ScriptedAnswers {
    fn ask(&self, prompt: &PromptDefinition, default: Option<&Value>) -> TrellisResult<Value> {
        self.asked.lock().unwrap().push(prompt.id.clone());
        self.answers
            .get(&prompt.id)
            .or(default)
            .cloned()
            .ok_or_else(|| {
                ApplicationError::PromptFailed {
                    prompt: prompt.id.clone(),
                    reason: "no scripted answer".into(),
                }
                .into()
            })
    }
}
