//! Local filesystem adapter using std::fs.

use std::io;
use std::path::Path;

use trellis_core::{
    application::{ApplicationError, ports::Filesystem},
    error::{TrellisError, TrellisResult},
};

/// Production filesystem implementation using `std::fs`.
#[derive(Debug, Clone, Copy)]
pub struct LocalFilesystem;

impl LocalFilesystem {
    /// Create a new local filesystem adapter.
    pub fn new() -> Self {
        Self
    }

    fn ensure_parent(path: &Path) -> TrellisResult<()> {
        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent)
                .map_err(|e| map_io_error(parent, e, "create directory")),
            _ => Ok(()),
        }
    }
}

impl Default for LocalFilesystem {
    fn default() -> Self {
        Self::new()
    }
}

impl Filesystem for LocalFilesystem {
    fn create_dir_all(&self, path: &Path) -> TrellisResult<()> {
        std::fs::create_dir_all(path).map_err(|e| map_io_error(path, e, "create directory"))
    }

    fn write_file(&self, path: &Path, content: &str) -> TrellisResult<()> {
        Self::ensure_parent(path)?;
        std::fs::write(path, content).map_err(|e| map_io_error(path, e, "write file"))
    }

    fn read_file(&self, path: &Path) -> TrellisResult<String> {
        std::fs::read_to_string(path).map_err(|e| map_io_error(path, e, "read file"))
    }

    fn append_file(&self, path: &Path, content: &str) -> TrellisResult<()> {
        use std::io::Write;

        Self::ensure_parent(path)?;
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .and_then(|mut file| file.write_all(content.as_bytes()))
            .map_err(|e| map_io_error(path, e, "append to file"))
    }

    fn remove_file(&self, path: &Path) -> TrellisResult<()> {
        std::fs::remove_file(path).map_err(|e| map_io_error(path, e, "remove file"))
    }

    fn rename(&self, from: &Path, to: &Path) -> TrellisResult<()> {
        Self::ensure_parent(to)?;
        std::fs::rename(from, to).map_err(|e| map_io_error(from, e, "rename"))
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn remove_dir_all(&self, path: &Path) -> TrellisResult<()> {
        std::fs::remove_dir_all(path).map_err(|e| map_io_error(path, e, "remove directory"))
    }
}

fn map_io_error(path: &Path, e: io::Error, operation: &str) -> TrellisError {
    ApplicationError::FilesystemError {
        path: path.to_path_buf(),
        reason: format!("Failed to {}: {}", operation, e),
    }
    .into()
}
