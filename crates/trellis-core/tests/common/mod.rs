//! Shared port doubles for the integration tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde_json::Value;
use trellis_core::application::ApplicationError;
use trellis_core::domain::interpolate;
use trellis_core::prelude::*;

// ============================================================================
// Fetcher
// ============================================================================

#[derive(Default)]
pub struct MapFetcher {
    documents: HashMap<DocumentLocation, String>,
}

impl MapFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, location: &str, text: &str) -> Self {
        self.documents
            .insert(DocumentLocation::parse(location), text.to_string());
        self
    }
}

impl DocumentFetcher for MapFetcher {
    fn fetch(&self, location: &DocumentLocation) -> TrellisResult<String> {
        self.documents.get(location).cloned().ok_or_else(|| {
            ApplicationError::ConfigurationNotFound {
                location: location.to_string(),
            }
            .into()
        })
    }
}

// ============================================================================
// Filesystem
// ============================================================================

/// Clones share the same file map so tests can inspect it after boxing.
#[derive(Clone, Default)]
pub struct SharedFs {
    files: Arc<Mutex<BTreeMap<PathBuf, String>>>,
}

impl SharedFs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read(&self, path: &str) -> Option<String> {
        self.files.lock().unwrap().get(Path::new(path)).cloned()
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.files.lock().unwrap().keys().cloned().collect()
    }

    fn missing(path: &Path) -> TrellisError {
        ApplicationError::FilesystemError {
            path: path.to_path_buf(),
            reason: "no such file".into(),
        }
        .into()
    }
}

impl Filesystem for SharedFs {
    fn create_dir_all(&self, _path: &Path) -> TrellisResult<()> {
        Ok(())
    }

    fn write_file(&self, path: &Path, content: &str) -> TrellisResult<()> {
        self.files
            .lock()
            .unwrap()
            .insert(path.to_path_buf(), content.to_string());
        Ok(())
    }

    fn read_file(&self, path: &Path) -> TrellisResult<String> {
        self.files
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| Self::missing(path))
    }

    fn append_file(&self, path: &Path, content: &str) -> TrellisResult<()> {
        self.files
            .lock()
            .unwrap()
            .entry(path.to_path_buf())
            .or_default()
            .push_str(content);
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> TrellisResult<()> {
        self.files
            .lock()
            .unwrap()
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| Self::missing(path))
    }

    fn rename(&self, from: &Path, to: &Path) -> TrellisResult<()> {
        let mut files = self.files.lock().unwrap();
        let content = files.remove(from).ok_or_else(|| Self::missing(from))?;
        files.insert(to.to_path_buf(), content);
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.lock().unwrap().contains_key(path)
    }

    fn is_dir(&self, _path: &Path) -> bool {
        false
    }

    fn remove_dir_all(&self, _path: &Path) -> TrellisResult<()> {
        Ok(())
    }
}

// ============================================================================
// Runner, renderer, prompter
// ============================================================================

/// Every command succeeds with empty output.
pub struct SilentRunner;

impl CommandRunner for SilentRunner {
    fn run_shell(&self, _command: &str, _cwd: Option<&Path>) -> TrellisResult<CommandOutput> {
        Ok(CommandOutput {
            status: Some(0),
            stdout: String::new(),
            stderr: String::new(),
        })
    }

    fn run_script(
        &self,
        _script: &ScriptSource,
        _args: &[String],
        _cwd: Option<&Path>,
    ) -> TrellisResult<CommandOutput> {
        self.run_shell("", None)
    }
}

/// Succeeds like [`SilentRunner`] and records each call's working directory.
#[derive(Clone, Default)]
pub struct RecordingRunner {
    dirs: Arc<Mutex<Vec<Option<PathBuf>>>>,
}

impl RecordingRunner {
    pub fn dirs(&self) -> Vec<Option<PathBuf>> {
        self.dirs.lock().unwrap().clone()
    }
}

impl CommandRunner for RecordingRunner {
    fn run_shell(&self, command: &str, cwd: Option<&Path>) -> TrellisResult<CommandOutput> {
        self.dirs.lock().unwrap().push(cwd.map(Path::to_path_buf));
        SilentRunner.run_shell(command, cwd)
    }

    fn run_script(
        &self,
        script: &ScriptSource,
        args: &[String],
        cwd: Option<&Path>,
    ) -> TrellisResult<CommandOutput> {
        self.dirs.lock().unwrap().push(cwd.map(Path::to_path_buf));
        SilentRunner.run_script(script, args, cwd)
    }
}

pub struct PlaceholderRenderer;

impl TemplateRenderer for PlaceholderRenderer {
    fn render(&self, template: &str, context: &ResolutionContext) -> TrellisResult<String> {
        Ok(interpolate(template, context))
    }
}

/// Always accepts the default.
pub struct DefaultsPrompter;

impl PromptCollector for DefaultsPrompter {
    fn ask(&self, prompt: &PromptDefinition, default: Option<&Value>) -> TrellisResult<Value> {
        default.cloned().ok_or_else(|| {
            ApplicationError::PromptFailed {
                prompt: prompt.id.clone(),
                reason: "no default".into(),
            }
            .into()
        })
    }
}

// ============================================================================
// Plugin and hooks
// ============================================================================

/// Writes `content` to `path`; fails when `fail` is set.
pub struct FileTask(pub TaskType);

impl TaskPlugin for FileTask {
    fn task_type(&self) -> TaskType {
        self.0
    }

    fn execute(&self, task: &TaskDefinition, ctx: &TaskContext<'_>) -> TrellisResult<TaskOutcome> {
        if task.config_bool("fail", false) {
            return Err(ApplicationError::TaskFailed {
                task: task.id.clone(),
                reason: "told to fail".into(),
            }
            .into());
        }
        let path = ctx.resolve_path(task.config_str("path").unwrap_or(&task.id));
        let content = ctx.render(task.config_str("content").unwrap_or_default())?;
        ctx.filesystem.write_file(&path, &content)?;
        Ok(TaskOutcome::changed(format!("wrote {}", path.display())))
    }

    fn diff(
        &self,
        task: &TaskDefinition,
        ctx: &TaskContext<'_>,
    ) -> TrellisResult<Option<String>> {
        let content = ctx.render(task.config_str("content").unwrap_or_default())?;
        Ok(Some(format!("+{content}")))
    }
}

pub fn plugins() -> PluginRegistry {
    PluginRegistry::new()
        .with(Box::new(FileTask(TaskType::Write)))
        .with(Box::new(FileTask(TaskType::Exec)))
}

/// Records every hook call as a short string.
#[derive(Clone, Default)]
pub struct RecordingHooks {
    pub events: Arc<Mutex<Vec<String>>>,
}

impl RecordingHooks {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

impl LifecycleHooks for RecordingHooks {
    fn before_all(&self, tasks: &[TaskDefinition], _ctx: &ResolutionContext) {
        self.push(format!("before_all:{}", tasks.len()));
    }

    fn before_task(&self, task: &TaskDefinition, _ctx: &ResolutionContext) {
        self.push(format!("before:{}", task.id));
    }

    fn after_task(&self, task: &TaskDefinition, _outcome: &TaskOutcome, _ctx: &ResolutionContext) {
        self.push(format!("after:{}", task.id));
    }

    fn on_error(&self, task: &TaskDefinition, _error: &TrellisError, _ctx: &ResolutionContext) {
        self.push(format!("error:{}", task.id));
    }

    fn after_all(&self, completed: &[String], _ctx: &ResolutionContext) {
        self.push(format!("after_all:{}", completed.join(",")));
    }
}

// ============================================================================
// Wiring
// ============================================================================

pub fn ports(fetcher: MapFetcher, fs: &SharedFs) -> Ports {
    Ports {
        fetcher: Box::new(fetcher),
        filesystem: Box::new(fs.clone()),
        runner: Box::new(SilentRunner),
        renderer: Box::new(PlaceholderRenderer),
        prompter: Box::new(DefaultsPrompter),
        schema: None,
    }
}

pub fn orchestrator(fetcher: MapFetcher, fs: &SharedFs) -> Orchestrator {
    Orchestrator::new(ports(fetcher, fs), plugins())
}

pub fn orchestrator_with_runner(
    fetcher: MapFetcher,
    fs: &SharedFs,
    runner: impl CommandRunner + 'static,
) -> Orchestrator {
    let ports = Ports {
        runner: Box::new(runner),
        ..ports(fetcher, fs)
    };
    Orchestrator::new(ports, plugins())
}
