//! Application settings.
//!
//! [`AppConfig`] is loaded once at startup and passed down by reference.
//! The CLI owns it; the core crate never sees it.
//!
//! # Resolution order (highest priority first)
//!
//! 1. CLI flags (applied at the call-site, not here)
//! 2. Environment variables: `TRELLIS_` prefix, `__` between sections,
//!    e.g. `TRELLIS_EXECUTION__COMMAND_TIMEOUT_SECS=30`
//! 3. Settings file: `--config FILE` (must exist) or the platform config
//!    path (optional)
//! 4. Built-in defaults

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context as _;
use config::{Config, Environment, File, Map};
use serde::{Deserialize, Serialize};

const ENV_PREFIX: &str = "TRELLIS";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub execution: ExecutionConfig,
    pub fetch: FetchConfig,
    pub prompts: PromptConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Upper bound for one shell command or script.
    pub command_timeout_secs: u64,
    /// Completion marker, relative to the run's working directory.
    pub marker_file: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub timeout_secs: u64,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    /// Ask on the terminal when stdin is one.
    pub interactive: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub no_color: bool,
    pub format: String,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            command_timeout_secs: 10,
            marker_file: PathBuf::from(".trellis/completed.json"),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: None,
        }
    }
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self { interactive: true }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            no_color: false,
            format: "auto".into(),
        }
    }
}

impl ExecutionConfig {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl AppConfig {
    /// Load settings from defaults, the settings file and the environment.
    ///
    /// An explicit `config_file` must exist; the default location is
    /// optional.
    pub fn load(config_file: Option<&PathBuf>) -> anyhow::Result<Self> {
        match config_file {
            Some(path) => Self::layered(path, true, None),
            None => Self::layered(&Self::config_path(), false, None),
        }
    }

    /// `env` replaces the process environment when given.
    fn layered(
        file: &Path,
        required: bool,
        env: Option<Map<String, String>>,
    ) -> anyhow::Result<Self> {
        let defaults = Config::try_from(&AppConfig::default())
            .context("Failed to encode built-in defaults")?;

        Config::builder()
            .add_source(defaults)
            .add_source(File::from(file).required(required))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .source(env),
            )
            .build()
            .with_context(|| format!("Failed to read settings from {}", file.display()))?
            .try_deserialize()
            .context("Invalid settings")
    }

    /// Path to the default settings file.
    ///
    /// Uses `directories::ProjectDirs`, falling back to `.trellis.toml` in
    /// the current directory.
    pub fn config_path() -> PathBuf {
        directories::ProjectDirs::from("dev", "trellis", "trellis")
            .map(|d| d.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from(".trellis.toml"))
    }

    pub fn to_toml(&self) -> anyhow::Result<String> {
        toml::to_string_pretty(self).context("Failed to render settings as TOML")
    }
}
