//! Remote document fetcher over HTTP(S).

use std::time::Duration;

use reqwest::blocking::Client;
use tracing::{debug, instrument};
use trellis_core::{
    application::{ApplicationError, ports::DocumentFetcher},
    domain::DocumentLocation,
    error::TrellisResult,
};

#[derive(Debug, Clone)]
pub struct HttpFetcherConfig {
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for HttpFetcherConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: format!("trellis/{}", trellis_core::VERSION),
        }
    }
}

/// Blocking HTTP fetcher. Any non-2xx response is a fetch error.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: HttpFetcherConfig) -> TrellisResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent)
            .build()
            .map_err(|e| ApplicationError::ConfigFetch {
                location: "http client".into(),
                reason: e.to_string(),
            })?;
        Ok(Self { client })
    }
}

impl DocumentFetcher for HttpFetcher {
    #[instrument(skip_all, fields(location = %location))]
    fn fetch(&self, location: &DocumentLocation) -> TrellisResult<String> {
        let DocumentLocation::Remote(url) = location else {
            return Err(ApplicationError::ConfigFetch {
                location: location.to_string(),
                reason: "not a remote location".into(),
            }
            .into());
        };

        let fetch_error = |reason: String| ApplicationError::ConfigFetch {
            location: url.clone(),
            reason,
        };

        debug!("Fetching remote document");
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| fetch_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(fetch_error(format!("HTTP {status}")).into());
        }

        Ok(response.text().map_err(|e| fetch_error(e.to_string()))?)
    }
}
