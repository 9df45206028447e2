//! CLI argument definitions using the clap derive API.
//!
//! This module is the *only* place that knows about argument names, aliases,
//! help text, and value enums. No business logic lives here.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

pub mod global;
pub use global::{GlobalArgs, OutputFormat};

// ── Top-level CLI ─────────────────────────────────────────────────────────────

#[derive(Debug, Parser)]
#[command(
    name    = "trellis",
    bin_name = "trellis",
    version  = env!("CARGO_PKG_VERSION"),
    author   = env!("CARGO_PKG_AUTHORS"),
    about    = "Declarative scaffolding plans: resolve, merge, order and run",
    long_about = "Trellis reads a configuration document (and the documents it \
                  extends), resolves its variables and prompts, and runs its \
                  tasks in dependency order.",
    after_help = "EXAMPLES:\n\
        \x20 trellis run trellis.json --var name=demo\n\
        \x20 trellis run base.json service.json --sequential --dry-run\n\
        \x20 trellis resolve https://example.com/plans/rust.json --format yaml\n\
        \x20 trellis completions bash > /usr/share/bash-completion/completions/trellis",
    arg_required_else_help = true,
    subcommand_required    = true,
)]
pub struct Cli {
    /// Flags available on every subcommand.
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

// ── Subcommands ───────────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Resolve one or more documents and run their tasks.
    #[command(
        visible_alias = "r",
        about = "Run a configuration document",
        after_help = "EXAMPLES:\n\
            \x20 trellis run trellis.json\n\
            \x20 trellis run trellis.json --dry-run --var env=prod\n\
            \x20 trellis run a.json b.json --sequential --yes --answer license=MIT"
    )]
    Run(RunArgs),

    /// Print the merged document without running anything.
    #[command(
        about = "Print the merged document",
        after_help = "EXAMPLES:\n\
            \x20 trellis resolve trellis.json\n\
            \x20 trellis resolve trellis.json --format yaml"
    )]
    Resolve(ResolveArgs),

    /// Load, merge, validate and order a document without running it.
    #[command(
        visible_alias = "check",
        about = "Validate a configuration document",
        after_help = "EXAMPLES:\n\
            \x20 trellis validate trellis.json\n\
            \x20 trellis validate trellis.json --output-format json"
    )]
    Validate(ValidateArgs),

    /// Generate shell completion scripts.
    #[command(
        about = "Generate shell completions",
        after_help = "EXAMPLES:\n\
            \x20 trellis completions bash > ~/.local/share/bash-completion/completions/trellis\n\
            \x20 trellis completions zsh  > ~/.zfunc/_trellis\n\
            \x20 trellis completions fish > ~/.config/fish/completions/trellis.fish"
    )]
    Completions(CompletionsArgs),

    /// Inspect the Trellis settings.
    #[command(
        about = "Show effective settings",
        subcommand,
        after_help = "EXAMPLES:\n\
            \x20 trellis config show\n\
            \x20 trellis config path"
    )]
    Config(ConfigCommands),
}

// ── run ───────────────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Documents to run: paths or http(s) URLs.
    ///
    /// A single document runs in merged mode. Several documents need
    /// `--sequential`: each gets its own variable and prompt pass, then all
    /// tasks run as one ordered set.
    #[arg(value_name = "CONFIG", required = true, num_args = 1..)]
    pub configs: Vec<String>,

    /// Report what would change without touching anything.
    #[arg(short = 'n', long = "dry-run", help = "Preview changes without applying them")]
    pub dry_run: bool,

    /// Ignore a completion marker and overwrite existing files.
    #[arg(short = 'f', long = "force", help = "Re-run a completed plan and overwrite files")]
    pub force: bool,

    #[arg(
        short = 's',
        long = "sequential",
        help = "Resolve each document's inputs in turn, then run all tasks"
    )]
    pub sequential: bool,

    /// Seed a variable; locked against later redefinition.
    #[arg(
        long = "var",
        value_name = "KEY=VALUE",
        value_parser = parse_key_value,
        help = "Set a variable (repeatable)"
    )]
    pub vars: Vec<(String, String)>,

    /// Pre-answer a prompt by id.
    #[arg(
        long = "answer",
        value_name = "KEY=VALUE",
        value_parser = parse_key_value,
        help = "Answer a prompt (repeatable)"
    )]
    pub answers: Vec<(String, String)>,

    /// Never ask; unanswered prompts take their defaults.
    #[arg(short = 'y', long = "yes", help = "Do not prompt; accept defaults")]
    pub yes: bool,

    /// Directory task paths and the completion marker are relative to.
    #[arg(long = "cwd", value_name = "DIR", help = "Working directory for tasks")]
    pub cwd: Option<PathBuf>,

    #[arg(long = "no-marker", help = "Neither read nor write a completion marker")]
    pub no_marker: bool,
}

/// `KEY=VALUE`, split on the first `=`.
pub fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{raw}'"));
    }
    Ok((key.to_string(), value.to_string()))
}

// ── resolve / validate ────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ResolveArgs {
    /// Root document: a path or an http(s) URL.
    #[arg(value_name = "CONFIG")]
    pub document: String,

    #[arg(long = "format", value_enum, default_value = "json", help = "Document format")]
    pub format: DocumentFormat,
}

#[derive(Debug, Args)]
pub struct ValidateArgs {
    /// Root document: a path or an http(s) URL.
    #[arg(value_name = "CONFIG")]
    pub document: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DocumentFormat {
    Json,
    Yaml,
}

// ── completions ───────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    #[arg(value_enum, help = "Shell to generate completions for")]
    pub shell: Shell,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

// ── config subcommands ────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Print the effective settings as TOML.
    Show,
    /// Print the path of the settings file.
    Path,
}

// ── tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_structure() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_run_command() {
        let cli = Cli::parse_from([
            "trellis",
            "run",
            "trellis.json",
            "--dry-run",
            "--var",
            "env=prod",
            "--answer",
            "name=a=b",
        ]);
        let Commands::Run(args) = cli.command else {
            panic!("expected Run command");
        };
        assert_eq!(args.configs, vec!["trellis.json"]);
        assert!(args.dry_run);
        assert_eq!(args.vars, vec![("env".to_string(), "prod".to_string())]);
        assert_eq!(args.answers, vec![("name".to_string(), "a=b".to_string())]);
    }

    #[test]
    fn run_accepts_several_documents() {
        let cli = Cli::parse_from(["trellis", "run", "a.json", "b.json", "--sequential"]);
        let Commands::Run(args) = cli.command else {
            panic!("expected Run command");
        };
        assert_eq!(args.configs.len(), 2);
        assert!(args.sequential);
    }

    #[test]
    fn run_requires_a_document() {
        assert!(Cli::try_parse_from(["trellis", "run"]).is_err());
    }

    #[test]
    fn key_value_needs_an_equals_sign() {
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=x").is_err());
        assert_eq!(parse_key_value("k=").unwrap(), ("k".into(), String::new()));
    }

    #[test]
    fn resolve_defaults_to_json() {
        let cli = Cli::parse_from(["trellis", "resolve", "x.json"]);
        let Commands::Resolve(args) = cli.command else {
            panic!("expected Resolve command");
        };
        assert_eq!(args.format, DocumentFormat::Json);
    }

    #[test]
    fn quiet_and_verbose_conflict() {
        let result = Cli::try_parse_from(["trellis", "--quiet", "--verbose", "config", "path"]);
        assert!(result.is_err());
    }

    #[test]
    fn no_color_flag_needs_no_value() {
        let cli = Cli::try_parse_from(["trellis", "--no-color", "config", "path"]).unwrap();
        assert!(cli.global.no_color);
    }
}
