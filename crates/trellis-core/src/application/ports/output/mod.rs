//! Driven (output) ports - implemented by infrastructure.
//!
//! These traits define what the application needs from external systems.
//! The `trellis-adapters` crate provides implementations.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;

use crate::domain::{
    DocumentLocation, DomainError, PromptDefinition, ResolutionContext, TaskDefinition, TaskType,
};
use crate::error::{TrellisError, TrellisResult};

/// Port for filesystem operations.
///
/// Implemented by:
/// - `trellis_adapters::filesystem::LocalFilesystem` (production)
/// - `trellis_adapters::filesystem::MemoryFilesystem` (testing)
pub trait Filesystem: Send + Sync {
    /// Create a directory and all parent directories.
    fn create_dir_all(&self, path: &Path) -> TrellisResult<()>;

    /// Write content to a file, replacing it. Parents are created.
    fn write_file(&self, path: &Path, content: &str) -> TrellisResult<()>;

    /// Read a whole file as UTF-8.
    fn read_file(&self, path: &Path) -> TrellisResult<String>;

    /// Append to a file, creating it if missing.
    fn append_file(&self, path: &Path, content: &str) -> TrellisResult<()>;

    fn remove_file(&self, path: &Path) -> TrellisResult<()>;

    fn rename(&self, from: &Path, to: &Path) -> TrellisResult<()>;

    /// Check if path exists.
    fn exists(&self, path: &Path) -> bool;

    fn is_dir(&self, path: &Path) -> bool;

    /// Remove a directory and all contents.
    fn remove_dir_all(&self, path: &Path) -> TrellisResult<()>;
}

/// Port for retrieving document text by location.
///
/// Used for configuration documents, template files and remote scripts
/// alike.
pub trait DocumentFetcher: Send + Sync {
    fn fetch(&self, location: &DocumentLocation) -> TrellisResult<String>;
}

/// What a [`CommandRunner`] should execute as a script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptSource {
    /// A script already on disk.
    Path(PathBuf),
    /// Script text; the runner materialises it into a temporary file.
    /// `extension` (without the dot) selects the interpreter.
    Inline {
        contents: String,
        extension: Option<String>,
    },
}

/// Captured result of a child process.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandOutput {
    /// `None` when the process was terminated by a signal.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

/// Port for running external commands.
///
/// Implementations enforce their own timeout: an expired child is killed and
/// reported as `ApplicationError::CommandTimedOut`, never left hanging.
pub trait CommandRunner: Send + Sync {
    /// Run through the platform shell.
    fn run_shell(&self, command: &str, cwd: Option<&Path>) -> TrellisResult<CommandOutput>;

    /// Run a script file with positional arguments.
    fn run_script(
        &self,
        script: &ScriptSource,
        args: &[String],
        cwd: Option<&Path>,
    ) -> TrellisResult<CommandOutput>;
}

/// Port for template rendering.
///
/// Implemented by:
/// - `trellis_adapters::renderer::SimpleRenderer` (variable substitution)
pub trait TemplateRenderer: Send + Sync {
    fn render(&self, template: &str, context: &ResolutionContext) -> TrellisResult<String>;
}

/// Port for structural validation of raw documents before typed decoding.
pub trait SchemaValidator: Send + Sync {
    /// Diagnostics for `document`; empty means valid.
    fn validate(&self, document: &Value) -> Vec<String>;
}

/// Port for asking the user a single question.
pub trait PromptCollector: Send + Sync {
    /// `default` is the already-resolved default value, if any.
    fn ask(&self, prompt: &PromptDefinition, default: Option<&Value>) -> TrellisResult<Value>;
}

/// Port for evaluating condition strings.
pub trait ConditionEvaluator: Send + Sync {
    fn evaluate(&self, condition: &str, ctx: &ResolutionContext) -> Result<bool, DomainError>;

    /// Evaluate to the expression's value; `None` is `undefined`.
    fn evaluate_value(
        &self,
        condition: &str,
        ctx: &ResolutionContext,
    ) -> Result<Option<Value>, DomainError>;

    /// Root identifiers the condition reads.
    fn references(&self, condition: &str) -> Result<Vec<String>, DomainError>;
}

// ============================================================================
// Task plugins
// ============================================================================

/// Everything a plugin may touch while executing one task.
pub struct TaskContext<'a> {
    pub context: &'a ResolutionContext,
    /// Working directory task paths are relative to.
    pub cwd: &'a Path,
    pub dry_run: bool,
    pub force: bool,
    pub filesystem: &'a dyn Filesystem,
    pub renderer: &'a dyn TemplateRenderer,
    pub runner: &'a dyn CommandRunner,
    pub fetcher: &'a dyn DocumentFetcher,
}

impl TaskContext<'_> {
    /// Resolve a task path against the working directory.
    pub fn resolve_path(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.cwd.join(path)
        }
    }

    /// Render a config string through the template renderer.
    pub fn render(&self, text: &str) -> TrellisResult<String> {
        self.renderer.render(text, self.context)
    }
}

/// Result of a successful task execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskOutcome {
    pub summary: String,
    /// False when the task found nothing to do.
    pub changed: bool,
}

impl TaskOutcome {
    pub fn changed(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            changed: true,
        }
    }

    pub fn unchanged(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            changed: false,
        }
    }
}

/// Executor for one task type.
pub trait TaskPlugin: Send + Sync {
    fn task_type(&self) -> TaskType;

    /// Static config checks, run before anything executes.
    fn validate(&self, task: &TaskDefinition) -> Result<(), DomainError> {
        let _ = task;
        Ok(())
    }

    fn execute(&self, task: &TaskDefinition, ctx: &TaskContext<'_>) -> TrellisResult<TaskOutcome>;

    /// Preview without mutation. `None` means the plugin has no preview and
    /// a generic "would run" entry is reported instead.
    fn diff(
        &self,
        task: &TaskDefinition,
        ctx: &TaskContext<'_>,
    ) -> TrellisResult<Option<String>> {
        let _ = (task, ctx);
        Ok(None)
    }
}

// ============================================================================
// Lifecycle hooks
// ============================================================================

/// Observer notified around task execution.
///
/// Hooks cannot veto a run; they fire only during real execution, never in
/// dry-run mode.
pub trait LifecycleHooks: Send + Sync {
    fn before_all(&self, tasks: &[TaskDefinition], ctx: &ResolutionContext) {
        let _ = (tasks, ctx);
    }

    fn before_task(&self, task: &TaskDefinition, ctx: &ResolutionContext) {
        let _ = (task, ctx);
    }

    fn after_task(&self, task: &TaskDefinition, outcome: &TaskOutcome, ctx: &ResolutionContext) {
        let _ = (task, outcome, ctx);
    }

    fn on_error(&self, task: &TaskDefinition, error: &TrellisError, ctx: &ResolutionContext) {
        let _ = (task, error, ctx);
    }

    /// Fires only when every task was attempted without a fatal failure.
    fn after_all(&self, completed: &[String], ctx: &ResolutionContext) {
        let _ = (completed, ctx);
    }
}
