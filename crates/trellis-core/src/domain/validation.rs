use std::collections::{HashMap, HashSet};

use crate::domain::{document::ConfigurationDocument, error::DomainError};

/// Id uniqueness rules.
///
/// Within one document every id must be unique per entity kind; override
/// strategies only apply between documents. After merging, an id may not be
/// shared by two different kinds, whatever the override strategy.
pub struct IdValidator;

impl IdValidator {
    pub fn validate_document(doc: &ConfigurationDocument) -> Result<(), DomainError> {
        let origin = doc.label();
        check_unique("task", doc.tasks.iter().map(|t| t.id.as_str()), &origin)?;
        check_unique(
            "variable",
            doc.variables.iter().map(|v| v.id.as_str()),
            &origin,
        )?;
        check_unique("prompt", doc.prompts.iter().map(|p| p.id.as_str()), &origin)?;
        Ok(())
    }

    /// Cross-kind collisions in a merged document.
    pub fn validate_merged(doc: &ConfigurationDocument) -> Result<(), DomainError> {
        let mut owners: HashMap<&str, &'static str> = HashMap::new();
        let entries = doc
            .tasks
            .iter()
            .map(|t| (t.id.as_str(), "task"))
            .chain(doc.variables.iter().map(|v| (v.id.as_str(), "variable")))
            .chain(doc.prompts.iter().map(|p| (p.id.as_str(), "prompt")));

        for (id, kind) in entries {
            match owners.get(id) {
                Some(&first_kind) if first_kind != kind => {
                    return Err(DomainError::IdCollision {
                        id: id.to_string(),
                        first_kind,
                        second_kind: kind,
                    });
                }
                Some(_) => {}
                None => {
                    owners.insert(id, kind);
                }
            }
        }
        Ok(())
    }
}

fn check_unique<'a>(
    kind: &'static str,
    ids: impl Iterator<Item = &'a str>,
    origin: &str,
) -> Result<(), DomainError> {
    let mut seen = HashSet::new();
    for id in ids {
        if id.trim().is_empty() {
            return Err(DomainError::InvalidDocument(format!(
                "{kind} with empty id in {origin}"
            )));
        }
        if !seen.insert(id) {
            return Err(DomainError::DuplicateId {
                kind,
                id: id.to_string(),
                first: origin.to_string(),
                second: origin.to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::document::{PromptDefinition, TaskDefinition, TaskType, VariableDefinition};
    use crate::domain::value_spec::ValueSpec;

    #[test]
    fn duplicate_task_in_one_document_is_rejected() {
        let mut doc = ConfigurationDocument::new("d");
        doc.tasks.push(TaskDefinition::new("t", TaskType::Write));
        doc.tasks.push(TaskDefinition::new("t", TaskType::Delete));

        assert!(matches!(
            IdValidator::validate_document(&doc),
            Err(DomainError::DuplicateId { kind: "task", .. })
        ));
    }

    #[test]
    fn same_id_across_kinds_collides() {
        let mut doc = ConfigurationDocument::new("d");
        doc.variables
            .push(VariableDefinition::new("name", ValueSpec::literal("x")));
        doc.prompts.push(PromptDefinition::new("name", "Name?"));

        assert!(IdValidator::validate_document(&doc).is_ok());
        assert_eq!(
            IdValidator::validate_merged(&doc),
            Err(DomainError::IdCollision {
                id: "name".into(),
                first_kind: "variable",
                second_kind: "prompt",
            })
        );
    }

    #[test]
    fn empty_id_is_invalid() {
        let mut doc = ConfigurationDocument::new("d");
        doc.prompts.push(PromptDefinition::new(" ", "?"));
        assert!(matches!(
            IdValidator::validate_document(&doc),
            Err(DomainError::InvalidDocument(_))
        ));
    }
}
