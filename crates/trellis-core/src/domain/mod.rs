// ============================================================================
//  CLEAN MODULE BOUNDARIES
// ============================================================================

//! Core domain layer for Trellis.
//!
//! Pure data and rules: the document model, value and enablement specs, the
//! restricted condition language, id rules and dependency ordering. All I/O
//! (fetching documents, running commands, asking questions, touching files)
//! is reached through ports defined in the application layer.
//!
//! ## Hexagonal Architecture Compliance
//!
//! - **No async**: Domain logic is synchronous
//! - **No I/O**: No filesystem, network, or external calls
//! - **Immutable documents**: loaded documents are only ever cloned and merged

pub mod conflicts;
pub mod context;
pub mod document;
pub mod error;
pub mod expression;
pub mod location;
pub mod task_graph;
pub mod value_spec;

mod validation;

pub use conflicts::ConflictGroups;
pub use context::{ResolutionContext, interpolate, placeholders, stringify};
pub use document::{
    ConfigurationDocument, Extends, OverrideStrategy, PromptDefinition, PromptKind,
    TaskDefinition, TaskType, VariableDefinition,
};
pub use error::{CycleKind, DomainError, ErrorCategory};
pub use expression::{Expression, RestrictedEvaluator, truthy};
pub use location::{DocumentLocation, Provenance};
pub use task_graph::{prune_dependencies, sort_tasks, topological_order};
pub use validation::IdValidator;
pub use value_spec::{EnabledSpec, ExecFileSpec, ValueSpec};
