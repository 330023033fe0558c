//! Documents read from and written to a local directory
//!
//! ## Path confinement
//!
//! Import URLs legitimately climb out of a document's directory (`../lib`),
//! so traversal is allowed by default. A confined backend rejects every path
//! that does not stay within its base directory after normalisation.

use super::{StorageBackend, StorageError, normalize_path};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Serves documents from a directory on disk
pub struct FileSystemStorageBackend {
    base_path: PathBuf,
    confined: bool,
}

impl FileSystemStorageBackend {
    /// Backend rooted at `base_path`; relative import URLs resolve against it
    ///
    /// ```rust
    /// use cellml_sdk::storage::filesystem::FileSystemStorageBackend;
    ///
    /// let backend = FileSystemStorageBackend::new("/models");
    /// assert!(backend.base_path().ends_with("models"));
    /// ```
    pub fn new(base_path: impl AsRef<Path>) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
            confined: false,
        }
    }

    /// Create a backend that refuses paths escaping `base_path`
    pub fn confined(base_path: impl AsRef<Path>) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
            confined: true,
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Join `path` onto the base and normalise it, enforcing confinement
    fn resolve_path(&self, path: &str) -> Result<PathBuf, StorageError> {
        let requested = Path::new(path);
        let full = if requested.is_absolute() {
            requested.to_path_buf()
        } else {
            self.base_path.join(requested)
        };
        let normalized = PathBuf::from(normalize_path(&full.to_string_lossy().replace('\\', "/")));

        if self.confined {
            let base = PathBuf::from(normalize_path(&self.base_path.to_string_lossy().replace('\\', "/")));
            if normalized.components().any(|c| matches!(c, std::path::Component::ParentDir))
                || !normalized.starts_with(&base)
            {
                return Err(StorageError::PermissionDenied(format!(
                    "Path escapes base directory: {}",
                    path
                )));
            }
        }

        Ok(normalized)
    }
}

impl StorageBackend for FileSystemStorageBackend {
    fn read_file(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let full_path = self.resolve_path(path)?;
        debug!("Reading {}", full_path.display());

        fs::read(&full_path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::FileNotFound(path.to_string())
            } else {
                StorageError::IoError(format!("Failed to read file {}: {}", path, e))
            }
        })
    }

    fn write_file(&self, path: &str, content: &[u8]) -> Result<(), StorageError> {
        let full_path = self.resolve_path(path)?;

        if let Some(parent) = full_path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| {
                StorageError::IoError(format!("Failed to create directory {}: {}", parent.display(), e))
            })?;
        }

        fs::write(&full_path, content)
            .map_err(|e| StorageError::IoError(format!("Failed to write file {}: {}", path, e)))
    }

    fn file_exists(&self, path: &str) -> Result<bool, StorageError> {
        let full_path = self.resolve_path(path)?;
        Ok(full_path.is_file())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_then_read() {
        let temp = TempDir::new().unwrap();
        let backend = FileSystemStorageBackend::new(temp.path());

        backend.write_file("nested/model.cellml", b"<model/>").unwrap();
        assert!(backend.file_exists("nested/model.cellml").unwrap());
        assert_eq!(backend.read_file("nested/model.cellml").unwrap(), b"<model/>");
    }

    #[test]
    fn test_missing_file() {
        let temp = TempDir::new().unwrap();
        let backend = FileSystemStorageBackend::new(temp.path());

        assert!(matches!(
            backend.read_file("absent.cellml"),
            Err(StorageError::FileNotFound(_))
        ));
        assert!(!backend.file_exists("absent.cellml").unwrap());
    }

    #[test]
    fn test_unconfined_allows_parent_directory() {
        let temp = TempDir::new().unwrap();
        let inner = temp.path().join("inner");
        fs::create_dir_all(&inner).unwrap();
        fs::write(temp.path().join("lib.cellml"), "<model/>").unwrap();

        let backend = FileSystemStorageBackend::new(&inner);
        assert!(backend.read_file("../lib.cellml").is_ok());
    }

    #[test]
    fn test_confined_rejects_traversal() {
        let temp = TempDir::new().unwrap();
        let backend = FileSystemStorageBackend::confined(temp.path().join("inner"));

        assert!(matches!(
            backend.read_file("../lib.cellml"),
            Err(StorageError::PermissionDenied(_))
        ));
        assert!(matches!(
            backend.read_file("/etc/passwd"),
            Err(StorageError::PermissionDenied(_))
        ));
    }
}
