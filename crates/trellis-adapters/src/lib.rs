//! Infrastructure adapters for Trellis.
//!
//! This crate implements the ports defined in `trellis-core::application::ports`.
//! It contains all external dependencies and I/O operations: the local and
//! remote fetchers, the process runner, schema validation and the built-in
//! task plugins.

pub mod fetcher;
pub mod filesystem;
pub mod plugins;
pub mod prompter;
pub mod renderer;
pub mod runner;
pub mod schema;

// Re-export commonly used adapters
pub use fetcher::{CompositeFetcher, HttpFetcher, HttpFetcherConfig, InMemoryFetcher, LocalFetcher};
pub use filesystem::{LocalFilesystem, MemoryFilesystem};
pub use plugins::builtin_registry;
pub use prompter::ScriptedPrompter;
pub use renderer::SimpleRenderer;
pub use runner::{DEFAULT_COMMAND_TIMEOUT, ShellCommandRunner};
pub use schema::{DOCUMENT_SCHEMA, JsonSchemaValidator};
