//! `extends` chain resolution.
//!
//! Produces every document reachable from a root, ancestors strictly before
//! descendants, each exactly once:
//!
//! ```text
//!        root                 order: shared, a, b, root
//!       /    \
//!      a      b
//!       \    /
//!       shared
//! ```
//!
//! Traversal is depth-first and left-to-right over each document's targets,
//! driven by an explicit stack. A document that is still on the stack when
//! it is reached again closes a cycle.
//!
//! A second pass propagates enablement towards ancestors: a document with no
//! `enabled` of its own inherits the nearest descendant's effective spec.

use std::collections::{HashMap, HashSet};

use tracing::{debug, instrument};

use super::loader::ConfigLoader;
use crate::domain::{ConfigurationDocument, CycleKind, DocumentLocation, DomainError, EnabledSpec};
use crate::error::TrellisResult;

/// A document in resolution order, with its effective enablement.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedDocument {
    pub document: ConfigurationDocument,
    /// Own spec, or one inherited from a descendant or the caller.
    pub effective_enabled: Option<EnabledSpec>,
}

impl ResolvedDocument {
    pub fn location(&self) -> Option<&DocumentLocation> {
        self.document.source.as_ref()
    }
}

struct Frame {
    location: DocumentLocation,
    document: ConfigurationDocument,
    targets: Vec<DocumentLocation>,
    next: usize,
}

impl Frame {
    fn new(location: DocumentLocation, document: ConfigurationDocument) -> Self {
        let targets = document
            .extends_targets()
            .into_iter()
            .map(|target| location.join(target))
            .collect();
        Self {
            location,
            document,
            targets,
            next: 0,
        }
    }
}

pub struct ExtendsResolver<'l, 'a> {
    loader: &'l mut ConfigLoader<'a>,
}

impl<'l, 'a> ExtendsResolver<'l, 'a> {
    pub fn new(loader: &'l mut ConfigLoader<'a>) -> Self {
        Self { loader }
    }

    /// Resolve the chain below `root`. `inherited` applies to the root when
    /// it has no `enabled` of its own.
    #[instrument(skip_all, fields(root = %root))]
    pub fn resolve(
        &mut self,
        root: &DocumentLocation,
        inherited: Option<EnabledSpec>,
    ) -> TrellisResult<Vec<ResolvedDocument>> {
        let ordered = self.ordered(root)?;
        debug!(documents = ordered.len(), "Resolved extends chain");
        Ok(propagate_enablement(ordered, inherited))
    }

    /// Post-order traversal: ancestors first, root last.
    fn ordered(&mut self, root: &DocumentLocation) -> TrellisResult<Vec<ConfigurationDocument>> {
        let mut order = Vec::new();
        let mut done: HashSet<DocumentLocation> = HashSet::new();
        let mut in_progress: HashSet<DocumentLocation> = HashSet::new();

        let document = self.loader.load(root)?;
        in_progress.insert(root.clone());
        let mut stack = vec![Frame::new(root.clone(), document)];

        while let Some(frame) = stack.last_mut() {
            if frame.next < frame.targets.len() {
                let target = frame.targets[frame.next].clone();
                frame.next += 1;

                if done.contains(&target) {
                    continue;
                }
                if in_progress.contains(&target) {
                    let start = stack
                        .iter()
                        .position(|f| f.location == target)
                        .unwrap_or(0);
                    let mut cycle: Vec<String> =
                        stack[start..].iter().map(|f| f.location.to_string()).collect();
                    cycle.push(target.to_string());
                    return Err(DomainError::CircularDependency {
                        kind: CycleKind::Extends,
                        cycle,
                    }
                    .into());
                }

                let document = self.loader.load(&target)?;
                in_progress.insert(target.clone());
                stack.push(Frame::new(target, document));
            } else if let Some(finished) = stack.pop() {
                in_progress.remove(&finished.location);
                done.insert(finished.location);
                order.push(finished.document);
            }
        }

        Ok(order)
    }
}

/// Hand enablement down to ancestors that have none of their own.
///
/// Walks from the root towards the ancestors so that every document's
/// effective spec is settled before its direct targets are visited. An
/// ancestor reachable through several descendants keeps the first spec it
/// receives.
fn propagate_enablement(
    ordered: Vec<ConfigurationDocument>,
    inherited: Option<EnabledSpec>,
) -> Vec<ResolvedDocument> {
    let position: HashMap<DocumentLocation, usize> = ordered
        .iter()
        .enumerate()
        .filter_map(|(i, doc)| doc.source.clone().map(|loc| (loc, i)))
        .collect();

    let mut effective: Vec<Option<EnabledSpec>> =
        ordered.iter().map(|doc| doc.enabled.clone()).collect();

    if let Some(root) = effective.last_mut() {
        if root.is_none() {
            *root = inherited;
        }
    }

    for i in (0..ordered.len()).rev() {
        let Some(spec) = effective[i].clone() else {
            continue;
        };
        let Some(source) = &ordered[i].source else {
            continue;
        };
        for target in ordered[i].extends_targets() {
            let target = source.join(target);
            let Some(&j) = position.get(&target) else {
                continue;
            };
            if ordered[j].enabled.is_none() && effective[j].is_none() {
                debug!(
                    ancestor = %target,
                    from = %source,
                    "Ancestor inherits enablement"
                );
                effective[j] = Some(spec.clone());
            }
        }
    }

    ordered
        .into_iter()
        .zip(effective)
        .map(|(document, effective_enabled)| ResolvedDocument {
            document,
            effective_enabled,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::StaticFetcher;
    use crate::error::TrellisError;

    fn names(resolved: &[ResolvedDocument]) -> Vec<&str> {
        resolved.iter().map(|r| r.document.name.as_str()).collect()
    }

    fn resolve(
        fetcher: &StaticFetcher,
        root: &str,
        inherited: Option<EnabledSpec>,
    ) -> TrellisResult<Vec<ResolvedDocument>> {
        let mut loader = ConfigLoader::new(fetcher);
        ExtendsResolver::new(&mut loader).resolve(&root.into(), inherited)
    }

    #[test]
    fn diamond_lists_shared_ancestor_once_and_first() {
        let fetcher = StaticFetcher::new()
            .with("root.json", r#"{"name":"root","extends":["a.json","b.json"]}"#)
            .with("a.json", r#"{"name":"a","extends":"shared.json"}"#)
            .with("b.json", r#"{"name":"b","extends":"./shared.json"}"#)
            .with("shared.json", r#"{"name":"shared"}"#);

        let resolved = resolve(&fetcher, "root.json", None).unwrap();

        assert_eq!(names(&resolved), vec!["shared", "a", "b", "root"]);
        assert_eq!(fetcher.fetch_count("shared.json"), 1);
    }

    #[test]
    fn relative_targets_follow_the_referencing_document() {
        let fetcher = StaticFetcher::new()
            .with("apps/web/child.json", r#"{"name":"child","extends":"../base.json"}"#)
            .with("apps/base.json", r#"{"name":"base"}"#);

        let resolved = resolve(&fetcher, "apps/web/child.json", None).unwrap();
        assert_eq!(names(&resolved), vec!["base", "child"]);
    }

    #[test]
    fn two_document_cycle_is_reported_not_looped() {
        let fetcher = StaticFetcher::new()
            .with("a.json", r#"{"name":"a","extends":"b.json"}"#)
            .with("b.json", r#"{"name":"b","extends":"a.json"}"#);

        match resolve(&fetcher, "a.json", None) {
            Err(TrellisError::Domain(DomainError::CircularDependency { kind, cycle })) => {
                assert_eq!(kind, CycleKind::Extends);
                assert_eq!(cycle, vec!["a.json", "b.json", "a.json"]);
            }
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn child_literal_false_disables_parent_without_own_spec() {
        let fetcher = StaticFetcher::new()
            .with("child.json", r#"{"name":"child","extends":"base.json","enabled":false}"#)
            .with("base.json", r#"{"name":"base"}"#);

        let resolved = resolve(&fetcher, "child.json", None).unwrap();
        assert_eq!(resolved[0].effective_enabled, Some(EnabledSpec::Literal(false)));
    }

    #[test]
    fn parent_with_own_condition_is_never_overwritten() {
        let fetcher = StaticFetcher::new()
            .with("child.json", r#"{"name":"child","extends":"base.json","enabled":false}"#)
            .with("base.json", r#"{"name":"base","enabled":{"condition":"X"}}"#);

        let resolved = resolve(&fetcher, "child.json", None).unwrap();
        assert_eq!(resolved[0].effective_enabled, Some(EnabledSpec::condition("X")));
    }

    #[test]
    fn propagation_is_transitive_through_bare_intermediates() {
        let fetcher = StaticFetcher::new()
            .with("c.json", r#"{"name":"c","extends":"b.json","enabled":"flag"}"#)
            .with("b.json", r#"{"name":"b","extends":"a.json"}"#)
            .with("a.json", r#"{"name":"a"}"#);

        let resolved = resolve(&fetcher, "c.json", None).unwrap();
        for doc in &resolved {
            assert_eq!(doc.effective_enabled, Some(EnabledSpec::condition("flag")));
        }
    }

    #[test]
    fn propagation_stops_at_ancestor_with_own_spec() {
        let fetcher = StaticFetcher::new()
            .with("c.json", r#"{"name":"c","extends":"b.json","enabled":"flag"}"#)
            .with("b.json", r#"{"name":"b","extends":"a.json","enabled":true}"#)
            .with("a.json", r#"{"name":"a"}"#);

        let resolved = resolve(&fetcher, "c.json", None).unwrap();
        assert_eq!(resolved[0].effective_enabled, Some(EnabledSpec::Literal(true)));
        assert_eq!(resolved[1].effective_enabled, Some(EnabledSpec::Literal(true)));
    }

    #[test]
    fn caller_supplied_spec_applies_to_bare_root() {
        let fetcher = StaticFetcher::new()
            .with("root.json", r#"{"name":"root","extends":"base.json"}"#)
            .with("base.json", r#"{"name":"base"}"#);

        let resolved =
            resolve(&fetcher, "root.json", Some(EnabledSpec::condition("ci"))).unwrap();
        assert!(
            resolved
                .iter()
                .all(|r| r.effective_enabled == Some(EnabledSpec::condition("ci")))
        );
    }
}
