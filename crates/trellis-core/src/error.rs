//! Unified error handling for Trellis Core.
//!
//! This module provides a unified error type that wraps domain and application
//! errors, with rich context and user-actionable suggestions.

use thiserror::Error;

use crate::application::ApplicationError;
use crate::domain::DomainError;

/// Root error type for Trellis Core operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TrellisError {
    /// Structural problems in configuration documents.
    #[error("{0}")]
    Domain(#[from] DomainError),

    /// Failures while loading or running.
    #[error("{0}")]
    Application(#[from] ApplicationError),

    /// Unexpected internal errors (bugs).
    #[error("Internal error: {message}. This is a bug, please report it.")]
    Internal { message: String },
}

impl TrellisError {
    /// Get user-actionable suggestions for fixing this error.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Domain(e) => e.suggestions(),
            Self::Application(e) => e.suggestions(),
            Self::Internal { .. } => vec![
                "This appears to be a bug in Trellis".into(),
                "Please report this issue at: https://github.com/cosecruz/trellis/issues".into(),
            ],
        }
    }

    /// Get error category for display/styling purposes.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Domain(e) => match e.category() {
                crate::domain::ErrorCategory::Validation => ErrorCategory::Validation,
                crate::domain::ErrorCategory::Conflict => ErrorCategory::Conflict,
                crate::domain::ErrorCategory::NotFound => ErrorCategory::NotFound,
                crate::domain::ErrorCategory::Internal => ErrorCategory::Internal,
            },
            Self::Application(e) => e.category(),
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// Structural errors abort a run before any task executes.
    pub fn is_structural(&self) -> bool {
        match self {
            Self::Domain(_) => true,
            Self::Application(e) => matches!(
                e,
                ApplicationError::ConfigurationNotFound { .. }
                    | ApplicationError::ConfigParse { .. }
                    | ApplicationError::ConfigFetch { .. }
                    | ApplicationError::SchemaValidation { .. }
            ),
            Self::Internal { .. } => false,
        }
    }
}

/// Error categories for UI display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Conflict,
    NotFound,
    Configuration,
    Internal,
}

/// Convenient result type alias.
pub type TrellisResult<T> = Result<T, TrellisError>;
