//! Application layer errors.
//!
//! These errors represent failures at the edges of a run: reading and
//! decoding documents, talking to adapters, and executing tasks. Structural
//! mistakes inside documents are `DomainError` from `crate::domain`.

use std::path::PathBuf;
use thiserror::Error;

use crate::error::ErrorCategory;

/// Errors that occur during loading and orchestration.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ApplicationError {
    /// A referenced document does not exist.
    #[error("Configuration not found: {location}")]
    ConfigurationNotFound { location: String },

    /// A document could not be decoded.
    #[error("Failed to parse {location}: {reason}")]
    ConfigParse { location: String, reason: String },

    /// A remote document could not be retrieved.
    #[error("Failed to fetch {location}: {reason}")]
    ConfigFetch { location: String, reason: String },

    /// A document does not satisfy the document schema.
    #[error("{location} does not match the configuration schema")]
    SchemaValidation {
        location: String,
        diagnostics: Vec<String>,
    },

    /// Template rendering failed.
    #[error("Template rendering failed: {reason}")]
    Transformer { reason: String },

    /// Filesystem operation failed.
    #[error("Filesystem error at {path}: {reason}")]
    FilesystemError { path: PathBuf, reason: String },

    /// A child process could not be started or exited unsuccessfully.
    #[error("Command failed: {command}: {reason}")]
    CommandFailed { command: String, reason: String },

    /// A child process outlived its timeout and was killed.
    #[error("Command timed out after {seconds}s: {command}")]
    CommandTimedOut { command: String, seconds: u64 },

    /// The prompt collector could not obtain an answer.
    #[error("Prompt '{prompt}' failed: {reason}")]
    PromptFailed { prompt: String, reason: String },

    /// A task plugin reported failure.
    #[error("Task '{task}' failed: {reason}")]
    TaskFailed { task: String, reason: String },

    /// A required task failed and halted the run.
    #[error(
        "Required task '{task}' failed after {completed} completed task(s), \
         {remaining} not run: {reason}"
    )]
    RequiredTaskFailed {
        task: String,
        reason: String,
        completed: usize,
        remaining: usize,
    },

    /// No plugin is registered for a task type.
    #[error("No plugin registered for task type '{task_type}'")]
    PluginNotRegistered { task_type: String },
}

impl ApplicationError {
    /// Get user-actionable suggestions.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::ConfigurationNotFound { location } => vec![
                format!("Nothing found at: {}", location),
                "Relative extends targets resolve against the referencing document".into(),
            ],
            Self::ConfigParse { reason, .. } => vec![
                format!("Details: {}", reason),
                "Documents are JSON unless the file ends in .yaml, .yml or .toml".into(),
            ],
            Self::ConfigFetch { location, .. } => vec![
                format!("Could not retrieve: {}", location),
                "Check the URL and your network connection".into(),
            ],
            Self::SchemaValidation { diagnostics, .. } => {
                let mut out: Vec<String> = diagnostics.iter().take(5).cloned().collect();
                out.push("Run `trellis validate <CONFIG>` after fixing".into());
                out
            }
            Self::FilesystemError { path, .. } => vec![
                format!("Failed to access: {}", path.display()),
                "Check that you have write permissions".into(),
            ],
            Self::CommandTimedOut { .. } => vec![
                "Raise execution.command_timeout_secs in the trellis config".into(),
            ],
            Self::RequiredTaskFailed { .. } => vec![
                "Already-applied tasks were not rolled back".into(),
                "Mark the task \"required\": false to continue past failures".into(),
            ],
            Self::PluginNotRegistered { task_type } => vec![
                format!("Unknown task type: {}", task_type),
                "This is likely a configuration error".into(),
            ],
            _ => vec!["Check the error details above".into()],
        }
    }

    /// Get error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ConfigurationNotFound { .. } => ErrorCategory::NotFound,
            Self::ConfigParse { .. } | Self::SchemaValidation { .. } => ErrorCategory::Validation,
            Self::ConfigFetch { .. } => ErrorCategory::NotFound,
            Self::PluginNotRegistered { .. } => ErrorCategory::Configuration,
            Self::PromptFailed { .. } => ErrorCategory::Validation,
            Self::Transformer { .. }
            | Self::FilesystemError { .. }
            | Self::CommandFailed { .. }
            | Self::CommandTimedOut { .. }
            | Self::TaskFailed { .. }
            | Self::RequiredTaskFailed { .. } => ErrorCategory::Internal,
        }
    }
}
