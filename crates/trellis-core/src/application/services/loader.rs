//! Configuration loading.
//!
//! ```text
//! location ──fetch──▶ text ──parse──▶ raw JSON ──schema──▶ typed document
//!                                                            │
//!                                          provenance + id checks
//! ```
//!
//! Every document is loaded at most once per run; the cache is keyed by
//! normalised location, so `./a/../base.json` and `base.json` share an entry.

use std::collections::HashMap;

use serde_json::Value;
use tracing::{debug, instrument};

use crate::application::{
    ApplicationError,
    ports::{DocumentFetcher, SchemaValidator},
};
use crate::domain::{ConfigurationDocument, DocumentLocation, IdValidator};
use crate::error::TrellisResult;

/// Document formats, picked by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Yaml,
    Toml,
}

impl DocumentFormat {
    /// JSON unless the extension says otherwise.
    pub fn for_location(location: &DocumentLocation) -> Self {
        match location.extension().as_deref() {
            Some("yaml" | "yml") => Self::Yaml,
            Some("toml") => Self::Toml,
            _ => Self::Json,
        }
    }

    pub fn parse(self, text: &str) -> Result<Value, String> {
        match self {
            Self::Json => serde_json::from_str(text).map_err(|e| e.to_string()),
            Self::Yaml => serde_yaml::from_str(text).map_err(|e| e.to_string()),
            Self::Toml => toml::from_str(text).map_err(|e| e.to_string()),
        }
    }
}

/// Identity-keyed document cache, scoped to one run.
#[derive(Debug, Default)]
pub struct DocumentCache {
    documents: HashMap<DocumentLocation, ConfigurationDocument>,
}

impl DocumentCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, location: &DocumentLocation) -> Option<&ConfigurationDocument> {
        self.documents.get(location)
    }

    pub fn insert(&mut self, location: DocumentLocation, document: ConfigurationDocument) {
        self.documents.insert(location, document);
    }

    pub fn contains(&self, location: &DocumentLocation) -> bool {
        self.documents.contains_key(location)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// Fetches, validates and decodes configuration documents.
pub struct ConfigLoader<'a> {
    fetcher: &'a dyn DocumentFetcher,
    schema: Option<&'a dyn SchemaValidator>,
    cache: DocumentCache,
}

impl<'a> ConfigLoader<'a> {
    pub fn new(fetcher: &'a dyn DocumentFetcher) -> Self {
        Self {
            fetcher,
            schema: None,
            cache: DocumentCache::new(),
        }
    }

    /// Validate every raw document against a schema before decoding.
    pub fn with_schema(mut self, schema: Option<&'a dyn SchemaValidator>) -> Self {
        self.schema = schema;
        self
    }

    pub fn cache(&self) -> &DocumentCache {
        &self.cache
    }

    /// Load a document, from cache when already seen this run.
    #[instrument(skip_all, fields(location = %location))]
    pub fn load(&mut self, location: &DocumentLocation) -> TrellisResult<ConfigurationDocument> {
        if let Some(cached) = self.cache.get(location) {
            debug!("Document cache hit");
            return Ok(cached.clone());
        }

        let text = self.fetcher.fetch(location)?;
        let document = self.decode(location, &text)?;
        debug!(
            tasks = document.tasks.len(),
            variables = document.variables.len(),
            prompts = document.prompts.len(),
            "Loaded document"
        );

        self.cache.insert(location.clone(), document.clone());
        Ok(document)
    }

    /// Parse, schema-check and decode document text.
    pub fn decode(
        &self,
        location: &DocumentLocation,
        text: &str,
    ) -> TrellisResult<ConfigurationDocument> {
        let format = DocumentFormat::for_location(location);
        let raw = format
            .parse(text)
            .map_err(|reason| ApplicationError::ConfigParse {
                location: location.to_string(),
                reason,
            })?;

        if let Some(schema) = self.schema {
            let diagnostics = schema.validate(&raw);
            if !diagnostics.is_empty() {
                return Err(ApplicationError::SchemaValidation {
                    location: location.to_string(),
                    diagnostics,
                }
                .into());
            }
        }

        let mut document: ConfigurationDocument =
            serde_json::from_value(raw).map_err(|e| ApplicationError::ConfigParse {
                location: location.to_string(),
                reason: e.to_string(),
            })?;

        document.source = Some(location.clone());
        document.annotate_provenance();
        IdValidator::validate_document(&document)?;

        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::StaticFetcher;
    use crate::domain::DomainError;
    use crate::error::TrellisError;

    #[test]
    fn format_follows_extension() {
        assert_eq!(
            DocumentFormat::for_location(&"a/b.yml".into()),
            DocumentFormat::Yaml
        );
        assert_eq!(
            DocumentFormat::for_location(&"a/b.toml".into()),
            DocumentFormat::Toml
        );
        assert_eq!(
            DocumentFormat::for_location(&"https://h/x".into()),
            DocumentFormat::Json
        );
    }

    #[test]
    fn loads_yaml_and_stamps_provenance() {
        let fetcher = StaticFetcher::new().with(
            "cfg/base.yaml",
            "name: base\nvariables:\n  - id: env\n    value: dev\n",
        );
        let mut loader = ConfigLoader::new(&fetcher);

        let doc = loader.load(&"cfg/base.yaml".into()).unwrap();

        assert_eq!(doc.name, "base");
        let provenance = doc.variables[0].provenance.as_ref().unwrap();
        assert_eq!(provenance.source, DocumentLocation::parse("cfg/base.yaml"));
    }

    #[test]
    fn loads_toml() {
        let fetcher = StaticFetcher::new().with(
            "t.toml",
            "name = \"t\"\n[[tasks]]\nid = \"a\"\ntype = \"exec\"\nconfig = { command = \"true\" }\n",
        );
        let mut loader = ConfigLoader::new(&fetcher);
        let doc = loader.load(&"t.toml".into()).unwrap();
        assert_eq!(doc.tasks[0].config_str("command"), Some("true"));
    }

    #[test]
    fn same_identity_is_fetched_once() {
        let fetcher = StaticFetcher::new().with("a.json", r#"{"name":"a"}"#);
        let mut loader = ConfigLoader::new(&fetcher);

        loader.load(&"a.json".into()).unwrap();
        loader.load(&"./x/../a.json".into()).unwrap();

        assert_eq!(fetcher.fetch_count("a.json"), 1);
        assert_eq!(loader.cache().len(), 1);
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let fetcher = StaticFetcher::new().with("bad.json", "{ nope");
        let mut loader = ConfigLoader::new(&fetcher);
        assert!(matches!(
            loader.load(&"bad.json".into()),
            Err(TrellisError::Application(ApplicationError::ConfigParse { .. }))
        ));
    }

    #[test]
    fn duplicate_ids_in_one_document_fail_on_load() {
        let fetcher = StaticFetcher::new().with(
            "d.json",
            r#"{"tasks":[{"id":"t","type":"exec"},{"id":"t","type":"exec"}]}"#,
        );
        let mut loader = ConfigLoader::new(&fetcher);
        assert!(matches!(
            loader.load(&"d.json".into()),
            Err(TrellisError::Domain(DomainError::DuplicateId { .. }))
        ));
    }

    struct RejectAll;

    impl SchemaValidator for RejectAll {
        fn validate(&self, _document: &Value) -> Vec<String> {
            vec!["/tasks/0: missing id".into()]
        }
    }

    #[test]
    fn schema_runs_before_decoding() {
        let fetcher = StaticFetcher::new().with("s.json", r#"{"name":"s"}"#);
        let schema = RejectAll;
        let mut loader = ConfigLoader::new(&fetcher).with_schema(Some(&schema));

        match loader.load(&"s.json".into()) {
            Err(TrellisError::Application(ApplicationError::SchemaValidation {
                diagnostics,
                ..
            })) => assert_eq!(diagnostics, vec!["/tasks/0: missing id"]),
            other => panic!("expected schema failure, got {other:?}"),
        }
    }
}
