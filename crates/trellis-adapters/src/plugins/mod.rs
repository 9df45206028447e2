//! Built-in task plugins.
//!
//! | type            | config                                                    |
//! |-----------------|-----------------------------------------------------------|
//! | `write`         | `path`, one of `content`/`template`/`templateFile`, `overwrite` |
//! | `append`        | `path`, one of `content`/`template`/`templateFile`, `newline`   |
//! | `delete`        | `path`                                                    |
//! | `rename`        | `from`, `to`                                              |
//! | `regex-replace` | `path`, `pattern`, one of `replacement`/`replacementFile`, `global` |
//! | `exec`          | one of `command`/`script`, `args`, `cwd`                  |
//! | `git-init`      | `path`, `initialBranch`                                   |
//!
//! String fields are rendered against the run context before use. Paths
//! are relative to the run's working directory; template and script files
//! are relative to the document that declared the task.

mod append;
mod delete;
mod exec;
mod git_init;
mod regex_replace;
mod rename;
mod support;
mod write;

pub use append::AppendPlugin;
pub use delete::DeletePlugin;
pub use exec::ExecPlugin;
pub use git_init::GitInitPlugin;
pub use regex_replace::RegexReplacePlugin;
pub use rename::RenamePlugin;
pub use write::WritePlugin;

use trellis_core::application::ports::PluginRegistry;

/// Registry with every built-in task type.
pub fn builtin_registry() -> PluginRegistry {
    PluginRegistry::new()
        .with(Box::new(WritePlugin))
        .with(Box::new(AppendPlugin))
        .with(Box::new(DeletePlugin))
        .with(Box::new(RenamePlugin))
        .with(Box::new(RegexReplacePlugin))
        .with(Box::new(ExecPlugin))
        .with(Box::new(GitInitPlugin))
}
