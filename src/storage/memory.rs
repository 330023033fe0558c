//! In-memory storage backend

use super::{StorageBackend, StorageError, normalize_path};
use std::cell::RefCell;
use std::collections::HashMap;

/// Documents keyed by normalised path
#[derive(Debug, Default)]
pub struct InMemoryStorageBackend {
    files: RefCell<HashMap<String, Vec<u8>>>,
}

impl InMemoryStorageBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with_file(self, path: &str, content: impl Into<Vec<u8>>) -> Self {
        self.insert(path, content);
        self
    }

    pub fn insert(&self, path: &str, content: impl Into<Vec<u8>>) {
        self.files.borrow_mut().insert(normalize_path(path), content.into());
    }

    pub fn len(&self) -> usize {
        self.files.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.borrow().is_empty()
    }
}

impl StorageBackend for InMemoryStorageBackend {
    fn read_file(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        self.files
            .borrow()
            .get(&normalize_path(path))
            .cloned()
            .ok_or_else(|| StorageError::FileNotFound(path.to_string()))
    }

    fn write_file(&self, path: &str, content: &[u8]) -> Result<(), StorageError> {
        self.insert(path, content.to_vec());
        Ok(())
    }

    fn file_exists(&self, path: &str) -> Result<bool, StorageError> {
        Ok(self.files.borrow().contains_key(&normalize_path(path)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_are_normalised() {
        let backend = InMemoryStorageBackend::new().with_file("lib/./units.cellml", "<model/>");

        assert!(backend.file_exists("lib/units.cellml").unwrap());
        assert_eq!(backend.read_to_string("x/../lib/units.cellml").unwrap(), "<model/>");
        assert!(matches!(
            backend.read_file("units.cellml"),
            Err(StorageError::FileNotFound(_))
        ));
    }
}
