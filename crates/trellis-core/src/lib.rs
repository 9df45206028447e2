//! Trellis Core - Hexagonal Architecture Implementation
//!
//! This crate provides the domain and application layers for Trellis, a
//! tool that turns layered, declarative scaffolding documents into one
//! ordered plan and runs it.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │           trellis-cli (CLI)             │
//! └──────────────────┬──────────────────────┘
//!                    │ calls
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │         Application Services            │
//! │  (ConfigResolver, Orchestrator, ...)    │
//! └──────────────────┬──────────────────────┘
//!                    │ uses
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │      Application Ports (Traits)         │
//! │ (Fetcher, Filesystem, Runner, Plugins)  │
//! └──────────────────┬──────────────────────┘
//!                    │ implemented by
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │     trellis-adapters (Infrastructure)   │
//! └─────────────────────────────────────────┘
//!                    │
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │         Domain Layer (Pure Logic)       │
//! │ (Documents, ValueSpec, Expressions,     │
//! │  task graph, id rules)                  │
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use trellis_core::prelude::*;
//!
//! # fn demo(ports: Ports, plugins: PluginRegistry) -> TrellisResult<()> {
//! let orchestrator = Orchestrator::new(ports, plugins);
//! let report = orchestrator.run_document(
//!     &DocumentLocation::parse("trellis.json"),
//!     RunOptions::default().dry_run(),
//! )?;
//! for diff in &report.diffs {
//!     println!("{}", diff.summary);
//! }
//! # Ok(())
//! # }
//! ```

pub mod domain;

pub mod application;

pub mod error;

// Public API - what external crates should use
pub mod prelude {
    pub use crate::application::{
        ConfigResolver, Orchestrator, Ports, RunOptions, RunPlan, RunReport, RunState,
        ports::{
            CommandOutput, CommandRunner, ConditionEvaluator, DocumentFetcher, Filesystem,
            HookRegistry, LifecycleHooks, PluginRegistry, PromptCollector, SchemaValidator,
            ScriptSource, TaskContext, TaskOutcome, TaskPlugin, TemplateRenderer,
        },
    };
    pub use crate::domain::{
        ConfigurationDocument, DocumentLocation, EnabledSpec, PromptDefinition, PromptKind,
        ResolutionContext, TaskDefinition, TaskType, ValueSpec, VariableDefinition,
    };
    pub use crate::error::{TrellisError, TrellisResult};
}

// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
