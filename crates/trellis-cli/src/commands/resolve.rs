//! `trellis resolve`: print the merged document.

use tracing::instrument;
use trellis_core::domain::{ConfigurationDocument, DocumentLocation};

use crate::{
    cli::{DocumentFormat, ResolveArgs},
    config::AppConfig,
    error::{CliError, CliResult},
    output::OutputManager,
    session,
};

#[instrument(skip_all, fields(document = %args.document))]
pub fn execute(args: ResolveArgs, config: &AppConfig, output: &OutputManager) -> CliResult<()> {
    let orchestrator = session::inspector(config)?;
    let merged = orchestrator
        .resolver()
        .resolve(&DocumentLocation::parse(&args.document))?;

    match args.format {
        DocumentFormat::Json => output.json(&merged)?,
        DocumentFormat::Yaml => output.document(&to_yaml(&merged)?)?,
    }
    Ok(())
}

fn to_yaml(document: &ConfigurationDocument) -> CliResult<String> {
    serde_yaml::to_string(document).map_err(|e| CliError::IoError {
        message: "rendering the merged document as YAML".into(),
        source: std::io::Error::other(e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yaml_keeps_document_field_names() {
        let document: ConfigurationDocument = serde_json::from_str(
            r#"{"name":"demo","tasks":[{"id":"readme","type":"write",
                "config":{"path":"README.md","content":"hi"}}]}"#,
        )
        .unwrap();
        let yaml = to_yaml(&document).unwrap();
        assert!(yaml.contains("name: demo"));
        assert!(yaml.contains("type: write"));
    }
}
