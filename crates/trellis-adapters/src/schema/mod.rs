//! JSON Schema validation of raw documents.

use jsonschema::{Draft, JSONSchema};
use serde_json::Value;
use tracing::debug;
use trellis_core::{
    application::ports::SchemaValidator,
    error::{TrellisError, TrellisResult},
};

/// Schema every configuration document is checked against.
pub const DOCUMENT_SCHEMA: &str = include_str!("document.schema.json");

pub struct JsonSchemaValidator {
    compiled: JSONSchema,
}

impl JsonSchemaValidator {
    /// Validator for the built-in document schema.
    pub fn builtin() -> TrellisResult<Self> {
        let schema: Value =
            serde_json::from_str(DOCUMENT_SCHEMA).map_err(|e| TrellisError::Internal {
                message: format!("document schema is not valid JSON: {e}"),
            })?;
        Self::from_schema(&schema)
    }

    pub fn from_schema(schema: &Value) -> TrellisResult<Self> {
        let compiled = JSONSchema::options()
            .with_draft(Draft::Draft7)
            .compile(schema)
            .map_err(|e| TrellisError::Internal {
                message: format!("schema does not compile: {e}"),
            })?;
        Ok(Self { compiled })
    }
}

impl SchemaValidator for JsonSchemaValidator {
    fn validate(&self, document: &Value) -> Vec<String> {
        match self.compiled.validate(document) {
            Ok(()) => Vec::new(),
            Err(errors) => {
                let diagnostics: Vec<String> = errors
                    .map(|e| {
                        let path = e.instance_path.to_string();
                        let path = if path.is_empty() { "/".to_string() } else { path };
                        format!("{path}: {e}")
                    })
                    .collect();
                debug!(count = diagnostics.len(), "Schema violations");
                diagnostics
            }
        }
    }
}
