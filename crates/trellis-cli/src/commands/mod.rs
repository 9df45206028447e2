//! One module per subcommand; each exposes `execute`.

pub mod completions;
pub mod config;
pub mod resolve;
pub mod run;
pub mod validate;
