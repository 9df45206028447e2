//! Application layer for Trellis.
//!
//! This layer contains:
//! - **Services**: Loading, merging, value resolution and orchestration
//! - **Ports**: Interface definitions (traits) for external dependencies
//! - **Errors**: Application-specific error types
//!
//! Structural rules (ids, cycles, ordering, conditions) live in
//! `crate::domain`; this layer sequences them and talks to adapters.

pub mod error;
pub mod ports;
pub mod services;

#[cfg(test)]
pub(crate) mod testing;

// Re-export main services
pub use services::{
    ConfigMerger, ConfigResolver, Orchestrator, Ports, RunOptions, RunPlan, RunReport, RunState,
};

// Re-export port traits (for adapter implementation)
pub use ports::{
    CommandRunner, ConditionEvaluator, DocumentFetcher, Filesystem, HookRegistry,
    LifecycleHooks, PluginRegistry, PromptCollector, SchemaValidator, TaskPlugin,
    TemplateRenderer,
};

pub use error::ApplicationError;
