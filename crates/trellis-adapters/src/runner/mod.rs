//! Process execution adapters.

mod shell;

pub use shell::{DEFAULT_COMMAND_TIMEOUT, ShellCommandRunner};
