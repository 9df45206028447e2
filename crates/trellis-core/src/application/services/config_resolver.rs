//! Root document → merged document, for callers that do not run tasks.

use tracing::instrument;

use super::extends_resolver::{ExtendsResolver, ResolvedDocument};
use super::loader::ConfigLoader;
use super::merger::ConfigMerger;
use crate::application::ports::{DocumentFetcher, SchemaValidator};
use crate::domain::{ConfigurationDocument, DocumentLocation, EnabledSpec};
use crate::error::TrellisResult;

pub struct ConfigResolver<'a> {
    fetcher: &'a dyn DocumentFetcher,
    schema: Option<&'a dyn SchemaValidator>,
    merger: ConfigMerger,
}

impl<'a> ConfigResolver<'a> {
    pub fn new(fetcher: &'a dyn DocumentFetcher) -> Self {
        Self {
            fetcher,
            schema: None,
            merger: ConfigMerger::builtin(),
        }
    }

    pub fn with_schema(mut self, schema: Option<&'a dyn SchemaValidator>) -> Self {
        self.schema = schema;
        self
    }

    pub fn with_merger(mut self, merger: ConfigMerger) -> Self {
        self.merger = merger;
        self
    }

    fn loader(&self) -> ConfigLoader<'a> {
        ConfigLoader::new(self.fetcher).with_schema(self.schema)
    }

    /// The fully merged document for `root`.
    pub fn resolve(&self, root: &DocumentLocation) -> TrellisResult<ConfigurationDocument> {
        self.resolve_with(root, None)
    }

    /// As [`resolve`](Self::resolve), with a caller-supplied enablement for
    /// a root that has none of its own.
    #[instrument(skip_all, fields(root = %root))]
    pub fn resolve_with(
        &self,
        root: &DocumentLocation,
        inherited: Option<EnabledSpec>,
    ) -> TrellisResult<ConfigurationDocument> {
        let chain = self.resolve_chain(root, inherited)?;
        self.merger.merge(&chain)
    }

    /// The ordered extends chain, before merging.
    pub fn resolve_chain(
        &self,
        root: &DocumentLocation,
        inherited: Option<EnabledSpec>,
    ) -> TrellisResult<Vec<ResolvedDocument>> {
        let mut loader = self.loader();
        ExtendsResolver::new(&mut loader).resolve(root, inherited)
    }

    /// Merge several roots independently, sharing one document cache.
    pub fn resolve_many(
        &self,
        roots: &[DocumentLocation],
        inherited: Option<EnabledSpec>,
    ) -> TrellisResult<Vec<ConfigurationDocument>> {
        let mut loader = self.loader();
        roots
            .iter()
            .map(|root| {
                let chain = ExtendsResolver::new(&mut loader).resolve(root, inherited.clone())?;
                self.merger.merge(&chain)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::StaticFetcher;
    use crate::domain::TaskType;

    #[test]
    fn resolves_and_merges_a_chain() {
        let fetcher = StaticFetcher::new()
            .with(
                "base.json",
                r#"{"name":"base","tasks":[{"id":"init","type":"git-init"}]}"#,
            )
            .with(
                "app.json",
                r#"{"name":"app","extends":"base.json",
                    "tasks":[{"id":"readme","type":"write","dependencies":["init"],
                              "config":{"path":"README.md","content":"hi"}}]}"#,
            );

        let merged = ConfigResolver::new(&fetcher)
            .resolve(&"app.json".into())
            .unwrap();

        assert_eq!(merged.name, "app");
        let types: Vec<TaskType> = merged.tasks.iter().map(|t| t.task_type).collect();
        assert_eq!(types, vec![TaskType::GitInit, TaskType::Write]);
    }

    #[test]
    fn shared_ancestor_is_fetched_once_across_roots() {
        let fetcher = StaticFetcher::new()
            .with("a.json", r#"{"name":"a","extends":"common.json"}"#)
            .with("b.json", r#"{"name":"b","extends":"common.json"}"#)
            .with("common.json", r#"{"name":"common"}"#);

        let docs = ConfigResolver::new(&fetcher)
            .resolve_many(&["a.json".into(), "b.json".into()], None)
            .unwrap();

        assert_eq!(docs.len(), 2);
        assert_eq!(fetcher.fetch_count("common.json"), 1);
    }
}
