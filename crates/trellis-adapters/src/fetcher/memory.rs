//! In-memory fetcher for tests and embedded documents.

use std::collections::HashMap;

use trellis_core::{
    application::{ApplicationError, ports::DocumentFetcher},
    domain::DocumentLocation,
    error::TrellisResult,
};

#[derive(Debug, Clone, Default)]
pub struct InMemoryFetcher {
    documents: HashMap<DocumentLocation, String>,
}

impl InMemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, location: &str, text: impl Into<String>) -> Self {
        self.insert(location, text);
        self
    }

    pub fn insert(&mut self, location: &str, text: impl Into<String>) {
        self.documents
            .insert(DocumentLocation::parse(location), text.into());
    }
}

impl DocumentFetcher for InMemoryFetcher {
    fn fetch(&self, location: &DocumentLocation) -> TrellisResult<String> {
        self.documents.get(location).cloned().ok_or_else(|| {
            ApplicationError::ConfigurationNotFound {
                location: location.to_string(),
            }
            .into()
        })
    }
}
