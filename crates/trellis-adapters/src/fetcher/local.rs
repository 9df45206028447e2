//! Local document fetcher.

use std::io::ErrorKind;
use std::path::PathBuf;

use tracing::{debug, instrument};
use trellis_core::{
    application::{ApplicationError, ports::DocumentFetcher},
    domain::DocumentLocation,
    error::TrellisResult,
};

/// Reads local paths; relative ones resolve against `base`.
#[derive(Debug, Clone, Default)]
pub struct LocalFetcher {
    base: Option<PathBuf>,
}

impl LocalFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base(base: impl Into<PathBuf>) -> Self {
        Self {
            base: Some(base.into()),
        }
    }
}

impl DocumentFetcher for LocalFetcher {
    #[instrument(skip_all, fields(location = %location))]
    fn fetch(&self, location: &DocumentLocation) -> TrellisResult<String> {
        let DocumentLocation::Local(path) = location else {
            return Err(ApplicationError::ConfigFetch {
                location: location.to_string(),
                reason: "not a local path".into(),
            }
            .into());
        };

        let path = match &self.base {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.clone(),
        };
        debug!(path = %path.display(), "Reading document");

        let text = std::fs::read_to_string(&path).map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                ApplicationError::ConfigurationNotFound {
                    location: location.to_string(),
                }
            } else {
                ApplicationError::FilesystemError {
                    path: path.clone(),
                    reason: e.to_string(),
                }
            }
        })?;
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_core::error::TrellisError;

    #[test]
    fn reads_relative_to_base() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("trellis.json"), "{}").unwrap();

        let text = LocalFetcher::with_base(dir.path())
            .fetch(&DocumentLocation::parse("trellis.json"))
            .unwrap();
        assert_eq!(text, "{}");
    }

    #[test]
    fn url_is_a_fetch_error() {
        let err = LocalFetcher::new()
            .fetch(&DocumentLocation::parse("https://example.com/a.json"))
            .unwrap_err();
        assert!(matches!(
            err,
            TrellisError::Application(ApplicationError::ConfigFetch { .. })
        ));
    }

    #[test]
    fn missing_document_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = LocalFetcher::with_base(dir.path())
            .fetch(&DocumentLocation::parse("absent.json"))
            .unwrap_err();
        assert!(matches!(
            err,
            TrellisError::Application(ApplicationError::ConfigurationNotFound { .. })
        ));
    }
}
