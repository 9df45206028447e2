//! The shared key → value store threaded through a run.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Accumulates resolved variables and prompt answers.
///
/// Values are JSON so that exec output, prompt answers and literals share a
/// single representation. Lookups accept dotted paths (`project.name`) and
/// numeric segments index into arrays (`authors.0`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResolutionContext {
    values: Map<String, Value>,
}

impl ResolutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    /// Merge a batch of freshly resolved entries, in order.
    pub fn extend<I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        for (key, value) in entries {
            self.values.insert(key, value);
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Resolve a dotted path.
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let mut current = self.values.get(segments.next()?.trim())?;
        for segment in segments {
            current = step(current, segment.trim())?;
        }
        Some(current)
    }

    /// Immutable copy used by pure evaluation phases.
    pub fn snapshot(&self) -> ResolutionContext {
        self.clone()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.values.keys()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.values
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.values.clone())
    }
}

impl From<Map<String, Value>> for ResolutionContext {
    fn from(values: Map<String, Value>) -> Self {
        Self { values }
    }
}

impl FromIterator<(String, Value)> for ResolutionContext {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

fn step<'a>(value: &'a Value, segment: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => items.get(segment.parse::<usize>().ok()?),
        _ => None,
    }
}

/// Render a value the way placeholders see it.
///
/// Strings are inserted without quotes, `null` becomes empty, everything
/// else uses its JSON text.
pub fn stringify(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Substitute every `{{ dotted.path }}` placeholder from `context`.
///
/// Unknown paths become empty strings. An unterminated `{{` is copied
/// through verbatim.
pub fn interpolate(template: &str, context: &ResolutionContext) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let path = after[..end].trim();
                if let Some(value) = context.lookup(path) {
                    out.push_str(&stringify(value));
                }
                rest = &after[end + 2..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }

    out.push_str(rest);
    out
}

/// Root identifiers referenced by `{{ }}` placeholders in `template`.
pub fn placeholders(template: &str) -> Vec<String> {
    let mut found = Vec::new();
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else { break };
        let path = after[..end].trim();
        if let Some(root) = path.split('.').next().filter(|r| !r.is_empty()) {
            found.push(root.to_string());
        }
        rest = &after[end + 2..];
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn interpolates_flat_and_dotted_paths() {
        let ctx = ResolutionContext::new()
            .with("name", "World")
            .with("project", json!({"meta": {"version": 2}}));

        assert_eq!(interpolate("Hello {{name}}!", &ctx), "Hello World!");
        assert_eq!(
            interpolate("v{{ project.meta.version }}", &ctx),
            "v2"
        );
    }

    #[test]
    fn unknown_placeholder_renders_empty() {
        let ctx = ResolutionContext::new();
        assert_eq!(interpolate("a{{missing}}b", &ctx), "ab");
    }

    #[test]
    fn unterminated_placeholder_is_copied() {
        let ctx = ResolutionContext::new().with("x", 1);
        assert_eq!(interpolate("{{x}} and {{y", &ctx), "1 and {{y");
    }

    #[test]
    fn lookup_indexes_arrays() {
        let ctx = ResolutionContext::new().with("authors", json!(["ada", "grace"]));
        assert_eq!(ctx.lookup("authors.1"), Some(&json!("grace")));
        assert_eq!(ctx.lookup("authors.9"), None);
    }

    #[test]
    fn placeholders_lists_root_identifiers() {
        assert_eq!(
            placeholders("{{a.b}}-{{ c }}-{{}}"),
            vec!["a".to_string(), "c".to_string()]
        );
    }

    #[test]
    fn stringify_unquotes_strings() {
        assert_eq!(stringify(&json!("x")), "x");
        assert_eq!(stringify(&json!(true)), "true");
        assert_eq!(stringify(&Value::Null), "");
    }
}
