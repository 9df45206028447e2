//! Routes locations to the local or remote fetcher.

use trellis_core::{
    application::{ApplicationError, ports::DocumentFetcher},
    domain::DocumentLocation,
    error::TrellisResult,
};

use super::{HttpFetcher, HttpFetcherConfig, LocalFetcher};

pub struct CompositeFetcher {
    local: Box<dyn DocumentFetcher>,
    remote: Option<Box<dyn DocumentFetcher>>,
}

impl CompositeFetcher {
    pub fn new(local: Box<dyn DocumentFetcher>, remote: Option<Box<dyn DocumentFetcher>>) -> Self {
        Self { local, remote }
    }

    /// Local files relative to the current directory, plus HTTP.
    pub fn standard(http: HttpFetcherConfig) -> TrellisResult<Self> {
        Ok(Self::new(
            Box::new(LocalFetcher::new()),
            Some(Box::new(HttpFetcher::new(http)?)),
        ))
    }

    /// Local files only; remote locations fail.
    pub fn offline() -> Self {
        Self::new(Box::new(LocalFetcher::new()), None)
    }
}

impl DocumentFetcher for CompositeFetcher {
    fn fetch(&self, location: &DocumentLocation) -> TrellisResult<String> {
        match (location, &self.remote) {
            (DocumentLocation::Local(_), _) => self.local.fetch(location),
            (DocumentLocation::Remote(_), Some(remote)) => remote.fetch(location),
            (DocumentLocation::Remote(url), None) => Err(ApplicationError::ConfigFetch {
                location: url.clone(),
                reason: "remote fetching is disabled".into(),
            }
            .into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::InMemoryFetcher;

    #[test]
    fn routes_by_location_kind() {
        let fetcher = CompositeFetcher::new(
            Box::new(InMemoryFetcher::new().with("a.json", "local")),
            Some(Box::new(
                InMemoryFetcher::new().with("https://example.com/a.json", "remote"),
            )),
        );

        assert_eq!(fetcher.fetch(&"a.json".into()).unwrap(), "local");
        assert_eq!(
            fetcher.fetch(&"https://example.com/a.json".into()).unwrap(),
            "remote"
        );
    }

    #[test]
    fn offline_rejects_urls() {
        let err = CompositeFetcher::offline()
            .fetch(&"https://example.com/a.json".into())
            .unwrap_err();
        assert!(err.to_string().contains("example.com"));
    }
}
