//! Application ports (traits) for external dependencies.
//!
//! In hexagonal architecture, ports define interfaces that the application
//! needs from the outside world. Adapters in `trellis-adapters` implement these.
//!
//! ## Port Types
//!
//! - **Driven (Output) Ports**: Called by application, implemented by infrastructure
//!   - `DocumentFetcher`: Document, template and script retrieval
//!   - `Filesystem`: File operations
//!   - `CommandRunner`: External processes with a timeout
//!   - `TemplateRenderer`: Template rendering
//!   - `SchemaValidator`: Raw document validation
//!   - `PromptCollector`: Interactive answers
//!   - `ConditionEvaluator`: Condition strings
//!   - `TaskPlugin` / `LifecycleHooks`: Task execution and observers
//!
//! - **Registries**: `PluginRegistry` and `HookRegistry`, built per run

pub mod output;
pub mod registry;

pub use output::{
    CommandOutput, CommandRunner, ConditionEvaluator, DocumentFetcher, Filesystem,
    LifecycleHooks, PromptCollector, SchemaValidator, ScriptSource, TaskContext, TaskOutcome,
    TaskPlugin, TemplateRenderer,
};
pub use registry::{HookRegistry, PluginRegistry};
