//! Simple variable substitution renderer.

use tracing::instrument;
use trellis_core::{
    application::{ApplicationError, ports::TemplateRenderer},
    domain::{ResolutionContext, interpolate, placeholders},
    error::TrellisResult,
};

/// `{{ dotted.path }}` substitution.
///
/// Lenient by default: unknown paths render as empty strings. In strict
/// mode a placeholder whose root is missing from the context is a
/// transformer error.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleRenderer {
    strict: bool,
}

impl SimpleRenderer {
    /// Create a new simple renderer.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn strict() -> Self {
        Self { strict: true }
    }
}

impl TemplateRenderer for SimpleRenderer {
    #[instrument(skip_all)]
    fn render(&self, template: &str, context: &ResolutionContext) -> TrellisResult<String> {
        if self.strict {
            let missing: Vec<String> = placeholders(template)
                .into_iter()
                .filter(|root| !context.contains_key(root))
                .collect();
            if !missing.is_empty() {
                return Err(ApplicationError::Transformer {
                    reason: format!("unknown placeholder(s): {}", missing.join(", ")),
                }
                .into());
            }
        }
        Ok(interpolate(template, context))
    }
}
