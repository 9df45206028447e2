//! In-memory filesystem adapter for testing and previews.

use std::{
    collections::{BTreeMap, BTreeSet},
    path::{Path, PathBuf},
    sync::{Arc, RwLock},
};

use trellis_core::{
    application::{ApplicationError, ports::Filesystem},
    error::{TrellisError, TrellisResult},
};

/// In-memory filesystem. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemoryFilesystem {
    inner: Arc<RwLock<MemoryFilesystemInner>>,
}

#[derive(Debug, Default)]
struct MemoryFilesystemInner {
    files: BTreeMap<PathBuf, String>,
    directories: BTreeSet<PathBuf>,
}

impl MemoryFilesystemInner {
    fn add_ancestors(&mut self, path: &Path) {
        let mut current = PathBuf::new();
        for component in path.components() {
            current.push(component);
            self.directories.insert(current.clone());
        }
    }
}

impl MemoryFilesystem {
    /// Create a new empty memory filesystem.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a file, creating its parents.
    pub fn with_file(self, path: impl AsRef<Path>, content: &str) -> Self {
        // Only fails on a poisoned lock.
        let _ = self.write_file(path.as_ref(), content);
        self
    }

    /// File content, if present (testing helper).
    pub fn contents(&self, path: impl AsRef<Path>) -> Option<String> {
        let inner = self.inner.read().ok()?;
        inner.files.get(path.as_ref()).cloned()
    }

    /// All file paths, sorted.
    pub fn list_files(&self) -> Vec<PathBuf> {
        self.inner
            .read()
            .map(|inner| inner.files.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn read(&self) -> TrellisResult<std::sync::RwLockReadGuard<'_, MemoryFilesystemInner>> {
        self.inner.read().map_err(|_| poisoned())
    }

    fn write(&self) -> TrellisResult<std::sync::RwLockWriteGuard<'_, MemoryFilesystemInner>> {
        self.inner.write().map_err(|_| poisoned())
    }
}

impl Filesystem for MemoryFilesystem {
    fn create_dir_all(&self, path: &Path) -> TrellisResult<()> {
        self.write()?.add_ancestors(path);
        Ok(())
    }

    fn write_file(&self, path: &Path, content: &str) -> TrellisResult<()> {
        let mut inner = self.write()?;
        if let Some(parent) = path.parent() {
            inner.add_ancestors(parent);
        }
        inner.files.insert(path.to_path_buf(), content.to_string());
        Ok(())
    }

    fn read_file(&self, path: &Path) -> TrellisResult<String> {
        self.read()?
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| missing(path))
    }

    fn append_file(&self, path: &Path, content: &str) -> TrellisResult<()> {
        let mut inner = self.write()?;
        if let Some(parent) = path.parent() {
            inner.add_ancestors(parent);
        }
        inner
            .files
            .entry(path.to_path_buf())
            .or_default()
            .push_str(content);
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> TrellisResult<()> {
        self.write()?
            .files
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| missing(path))
    }

    fn rename(&self, from: &Path, to: &Path) -> TrellisResult<()> {
        let mut inner = self.write()?;
        let content = inner.files.remove(from).ok_or_else(|| missing(from))?;
        if let Some(parent) = to.parent() {
            inner.add_ancestors(parent);
        }
        inner.files.insert(to.to_path_buf(), content);
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.inner
            .read()
            .map(|inner| inner.files.contains_key(path) || inner.directories.contains(path))
            .unwrap_or(false)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.inner
            .read()
            .map(|inner| inner.directories.contains(path))
            .unwrap_or(false)
    }

    fn remove_dir_all(&self, path: &Path) -> TrellisResult<()> {
        let mut inner = self.write()?;
        inner.directories.retain(|p| !p.starts_with(path));
        inner.files.retain(|p, _| !p.starts_with(path));
        Ok(())
    }
}

fn missing(path: &Path) -> TrellisError {
    ApplicationError::FilesystemError {
        path: path.to_path_buf(),
        reason: "No such file".into(),
    }
    .into()
}

fn poisoned() -> TrellisError {
    TrellisError::Internal {
        message: "memory filesystem lock poisoned".into(),
    }
}
