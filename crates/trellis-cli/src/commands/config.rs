//! `trellis config`: inspect the effective settings.

use std::path::PathBuf;

use serde_json::json;

use crate::{
    cli::{ConfigCommands, GlobalArgs, OutputFormat},
    config::AppConfig,
    error::{CliResult, IntoCli},
    output::OutputManager,
};

pub fn execute(
    cmd: ConfigCommands,
    global: &GlobalArgs,
    config: &AppConfig,
    output: &OutputManager,
) -> CliResult<()> {
    let json = output.format() == OutputFormat::Json;

    match cmd {
        ConfigCommands::Show if json => output.json(config)?,
        ConfigCommands::Show => {
            let text = config.to_toml().with_cli_context(|| "rendering settings")?;
            output.document(&text)?;
        }

        ConfigCommands::Path => {
            let path = settings_path(global);
            if json {
                output.json(&json!({ "path": path, "exists": path.exists() }))?;
            } else {
                output.document(&path.display().to_string())?;
            }
        }
    }

    Ok(())
}

/// `--config` when given, else the platform default.
fn settings_path(global: &GlobalArgs) -> PathBuf {
    global.config.clone().unwrap_or_else(AppConfig::config_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn global(config: Option<&str>) -> GlobalArgs {
        GlobalArgs {
            verbose: 0,
            quiet: false,
            no_color: true,
            config: config.map(PathBuf::from),
            output_format: OutputFormat::Plain,
        }
    }

    #[test]
    fn explicit_flag_wins_over_default_path() {
        assert_eq!(settings_path(&global(Some("/etc/trellis.toml"))), PathBuf::from("/etc/trellis.toml"));
        assert_eq!(settings_path(&global(None)), AppConfig::config_path());
    }
}
