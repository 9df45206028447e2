// ============================================================================
// domain/error.rs - STRUCTURAL ERRORS
// ============================================================================

use thiserror::Error;

/// Which graph a cycle was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleKind {
    /// Document `extends` chain.
    Extends,
    /// Task `dependencies` graph.
    Tasks,
}

impl std::fmt::Display for CycleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Extends => write!(f, "extends chain"),
            Self::Tasks => write!(f, "task dependencies"),
        }
    }
}

/// Root domain error type.
///
/// Everything here is an authoring mistake in a configuration document.
/// None of these have a safe workaround, so they always abort the run.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    // ========================================================================
    // Graph errors
    // ========================================================================
    #[error("Circular dependency in {kind}: {}", cycle.join(" -> "))]
    CircularDependency { kind: CycleKind, cycle: Vec<String> },

    #[error("Task '{task}' depends on unknown task '{missing}'")]
    TaskNotFound { task: String, missing: String },

    // ========================================================================
    // Identity errors
    // ========================================================================
    #[error("Duplicate {kind} id '{id}' (first defined in {first}, redefined in {second})")]
    DuplicateId {
        kind: &'static str,
        id: String,
        first: String,
        second: String,
    },

    #[error("Id '{id}' is used by both a {first_kind} and a {second_kind}")]
    IdCollision {
        id: String,
        first_kind: &'static str,
        second_kind: &'static str,
    },

    // ========================================================================
    // Shape errors
    // ========================================================================
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Invalid expression '{expression}': {reason}")]
    InvalidExpression { expression: String, reason: String },

    #[error("Task '{task}' is misconfigured: {reason}")]
    PluginConfiguration { task: String, reason: String },

    #[error("Required field missing: {field}")]
    MissingRequiredField { field: &'static str },
}

impl DomainError {
    /// Get user-actionable suggestions for fixing this error.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::CircularDependency { kind, cycle } => vec![
                format!("The {} forms a loop: {}", kind, cycle.join(" -> ")),
                "Remove one of the references to break the cycle".into(),
            ],
            Self::TaskNotFound { task, missing } => vec![
                format!("Task '{}' lists '{}' in its dependencies", task, missing),
                "Check the spelling, or make sure the document defining it is extended".into(),
            ],
            Self::DuplicateId { id, .. } => vec![
                format!("'{}' is defined more than once", id),
                "Rename one of them, or add \"override\": \"merge\" | \"replace\" to the later one"
                    .into(),
            ],
            Self::IdCollision { id, .. } => vec![
                format!("'{}' must be unique across tasks, variables and prompts", id),
                "Overrides never apply across entity kinds; rename one of them".into(),
            ],
            Self::PluginConfiguration { reason, .. } => vec![
                format!("Details: {}", reason),
                "Set exactly one field from each mutually exclusive group".into(),
            ],
            Self::InvalidExpression { .. } => vec![
                "Conditions support comparisons, &&, ||, !, property access and ?:".into(),
            ],
            _ => vec!["See documentation for more details".into()],
        }
    }

    /// Error category for CLI display styling.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::TaskNotFound { .. } => ErrorCategory::NotFound,
            Self::CircularDependency { .. }
            | Self::DuplicateId { .. }
            | Self::IdCollision { .. } => ErrorCategory::Conflict,
            _ => ErrorCategory::Validation,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Conflict,
    NotFound,
    Internal,
}
