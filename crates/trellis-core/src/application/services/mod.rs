//! Application services - orchestrate use cases.
//!
//! Services coordinate the domain layer and ports: loading and merging
//! documents, resolving values, and driving a run through the orchestrator.

pub mod config_resolver;
pub mod enablement;
pub mod extends_resolver;
pub mod loader;
pub mod merger;
pub mod orchestrator;
pub mod value_resolver;
pub mod variable_pipeline;

pub use config_resolver::ConfigResolver;
pub use enablement::{Enablement, Phase};
pub use extends_resolver::{ExtendsResolver, ResolvedDocument};
pub use loader::{ConfigLoader, DocumentCache, DocumentFormat};
pub use merger::{ConfigMerger, MergeEntry};
pub use orchestrator::{
    CompletedTask, CompletionMarker, Orchestrator, PlanSegment, Ports, RunOptions, RunPlan,
    RunReport, RunState, StateTransition, TaskDiff, TaskFailure,
};
pub use value_resolver::{ValueResolver, sniff};
pub use variable_pipeline::{RunInputs, VariablePipeline};
