//! Document identity and provenance.
//!
//! A [`DocumentLocation`] is the identity of a configuration document: two
//! references that normalise to the same location are the same document and
//! are loaded once per run.

use std::fmt;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Where a configuration document lives.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DocumentLocation {
    /// A path on the local filesystem, lexically normalised.
    Local(PathBuf),
    /// An `http(s)://` URL.
    Remote(String),
}

impl DocumentLocation {
    /// Parse a raw reference with no base to resolve against.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if is_url(raw) {
            Self::Remote(normalize_url(raw))
        } else {
            Self::Local(normalize_path(Path::new(raw)))
        }
    }

    /// Resolve `reference` relative to this location.
    ///
    /// URLs and absolute paths are taken as-is. Relative references resolve
    /// against the directory of a local document, or the URL "directory" of
    /// a remote one.
    pub fn join(&self, reference: &str) -> Self {
        let reference = reference.trim();
        if is_url(reference) {
            return Self::Remote(normalize_url(reference));
        }

        match self {
            Self::Local(path) => {
                let candidate = Path::new(reference);
                if candidate.is_absolute() {
                    return Self::Local(normalize_path(candidate));
                }
                let base = path.parent().unwrap_or_else(|| Path::new(""));
                Self::Local(normalize_path(&base.join(candidate)))
            }
            Self::Remote(url) => {
                let (origin, path) = split_origin(url);
                let joined = if reference.starts_with('/') {
                    reference.to_string()
                } else {
                    let dir = match path.rfind('/') {
                        Some(idx) => &path[..=idx],
                        None => "/",
                    };
                    format!("{dir}{reference}")
                };
                Self::Remote(normalize_url(&format!("{origin}{joined}")))
            }
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_))
    }

    /// Lower-cased file extension, used to pick a document format.
    pub fn extension(&self) -> Option<String> {
        let last = match self {
            Self::Local(path) => path.file_name()?.to_str()?.to_string(),
            Self::Remote(url) => {
                let (_, path) = split_origin(url);
                let path = path.split(['?', '#']).next().unwrap_or_default();
                path.rsplit('/').next()?.to_string()
            }
        };
        let (_, ext) = last.rsplit_once('.')?;
        Some(ext.to_ascii_lowercase())
    }

    /// Local directory this document lives in, if any.
    pub fn directory(&self) -> Option<&Path> {
        match self {
            Self::Local(path) => path.parent(),
            Self::Remote(_) => None,
        }
    }
}

impl fmt::Display for DocumentLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(path) => write!(f, "{}", path.display()),
            Self::Remote(url) => write!(f, "{url}"),
        }
    }
}

impl From<String> for DocumentLocation {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<&str> for DocumentLocation {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

impl From<DocumentLocation> for String {
    fn from(location: DocumentLocation) -> Self {
        location.to_string()
    }
}

/// Which document an entity came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    pub source: DocumentLocation,
    /// The owning document's `name`, possibly empty.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub document: String,
}

impl Provenance {
    pub fn new(source: DocumentLocation, document: impl Into<String>) -> Self {
        Self {
            source,
            document: document.into(),
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.document.is_empty() {
            write!(f, "{}", self.source)
        } else {
            write!(f, "'{}' ({})", self.document, self.source)
        }
    }
}

// ── helpers ───────────────────────────────────────────────────────────────────

fn is_url(raw: &str) -> bool {
    raw.starts_with("http://") || raw.starts_with("https://")
}

/// Split `scheme://host[:port]` from the path part of a URL.
fn split_origin(url: &str) -> (&str, &str) {
    let after_scheme = url.find("://").map(|i| i + 3).unwrap_or(0);
    match url[after_scheme..].find('/') {
        Some(idx) => url.split_at(after_scheme + idx),
        None => (url, ""),
    }
}

fn normalize_url(url: &str) -> String {
    let (origin, path) = split_origin(url);
    let (path, suffix) = match path.find(['?', '#']) {
        Some(idx) => path.split_at(idx),
        None => (path, ""),
    };

    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/').skip(1) {
        match segment {
            "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    if segments.is_empty() {
        format!("{origin}{suffix}")
    } else {
        format!("{origin}/{}{suffix}", segments.join("/"))
    }
}

/// Lexically normalise a path: drop `.` and fold `..` where possible.
fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let can_pop = matches!(
                    out.components().next_back(),
                    Some(Component::Normal(_))
                );
                if can_pop {
                    out.pop();
                } else if !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_join_resolves_against_parent_directory() {
        let child = DocumentLocation::parse("configs/app/child.json");
        assert_eq!(
            child.join("../base.json"),
            DocumentLocation::Local(PathBuf::from("configs/base.json"))
        );
        assert_eq!(
            child.join("./shared.yaml"),
            DocumentLocation::Local(PathBuf::from("configs/app/shared.yaml"))
        );
    }

    #[test]
    fn same_file_through_different_paths_is_same_identity() {
        let a = DocumentLocation::parse("a/./b/../c.json");
        let b = DocumentLocation::parse("a/c.json");
        assert_eq!(a, b);
    }

    #[test]
    fn remote_join_uses_url_directory() {
        let doc = DocumentLocation::parse("https://example.com/tpl/rust/child.json");
        assert_eq!(
            doc.join("../base.json").to_string(),
            "https://example.com/tpl/base.json"
        );
        assert_eq!(
            doc.join("/root.json").to_string(),
            "https://example.com/root.json"
        );
        assert!(doc.join("base.json").is_remote());
    }

    #[test]
    fn absolute_url_reference_wins() {
        let doc = DocumentLocation::parse("local/child.json");
        assert_eq!(
            doc.join("https://cdn.example.com/x.json"),
            DocumentLocation::Remote("https://cdn.example.com/x.json".into())
        );
    }

    #[test]
    fn extension_is_lowercased_and_ignores_query() {
        assert_eq!(
            DocumentLocation::parse("x/Config.YAML").extension().as_deref(),
            Some("yaml")
        );
        assert_eq!(
            DocumentLocation::parse("https://h/a.toml?raw=1")
                .extension()
                .as_deref(),
            Some("toml")
        );
        assert_eq!(DocumentLocation::parse("Makefile").extension(), None);
    }

    #[test]
    fn serializes_as_plain_string() {
        let loc = DocumentLocation::parse("https://example.com/a.json");
        let json = serde_json::to_string(&loc).unwrap();
        assert_eq!(json, "\"https://example.com/a.json\"");
        let back: DocumentLocation = serde_json::from_str(&json).unwrap();
        assert_eq!(back, loc);
    }
}
