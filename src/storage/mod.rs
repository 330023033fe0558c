//! Storage backend abstraction
//!
//! Import resolution fetches documents through the StorageBackend trait:
//! - FileSystemStorageBackend: native file system
//! - InMemoryStorageBackend: documents held in memory (tests, embedding)
//!
//! Fetches are synchronous; the engine performs one read per imported
//! document, sequentially.

pub mod filesystem;
pub mod memory;

pub use filesystem::FileSystemStorageBackend;
pub use memory::InMemoryStorageBackend;

/// Error type for storage operations
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("File not found: {0}")]
    FileNotFound(String),
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
}

/// Trait for storage backends
pub trait StorageBackend {
    /// Read a file from storage
    fn read_file(&self, path: &str) -> Result<Vec<u8>, StorageError>;

    /// Write a file to storage
    fn write_file(&self, path: &str, content: &[u8]) -> Result<(), StorageError>;

    /// Check if a file exists
    fn file_exists(&self, path: &str) -> Result<bool, StorageError>;

    /// Read a file as UTF-8 text
    fn read_to_string(&self, path: &str) -> Result<String, StorageError> {
        let bytes = self.read_file(path)?;
        String::from_utf8(bytes)
            .map_err(|e| StorageError::IoError(format!("File {} is not valid UTF-8: {}", path, e)))
    }
}

impl<B: StorageBackend + ?Sized> StorageBackend for &B {
    fn read_file(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        (**self).read_file(path)
    }

    fn write_file(&self, path: &str, content: &[u8]) -> Result<(), StorageError> {
        (**self).write_file(path, content)
    }

    fn file_exists(&self, path: &str) -> Result<bool, StorageError> {
        (**self).file_exists(path)
    }
}

/// Lexically normalise a `/`-separated path: drops `.` segments and folds
/// `..` into the preceding segment where one exists.
pub fn normalize_path(path: &str) -> String {
    let absolute = path.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => match segments.last() {
                Some(last) if *last != ".." => {
                    segments.pop();
                }
                _ if absolute => {}
                _ => segments.push(".."),
            },
            other => segments.push(other),
        }
    }
    let joined = segments.join("/");
    if absolute { format!("/{}", joined) } else { joined }
}

/// Resolve an import URL against the location of the importing document.
///
/// Absolute URLs (`/...`, `scheme://...`, drive letters) override the base;
/// `file://` is stripped. Relative URLs are joined to the directory of
/// `base_location`.
pub fn join_url(base_location: &str, url: &str) -> String {
    let url = url.trim();
    if let Some(stripped) = url.strip_prefix("file://") {
        return normalize_path(stripped);
    }
    if url.contains("://") {
        return url.to_string();
    }
    if url.starts_with('/') || is_drive_path(url) {
        return normalize_path(&url.replace('\\', "/"));
    }

    let base = base_location.strip_prefix("file://").unwrap_or(base_location);
    let base = base.replace('\\', "/");
    let directory = match base.rfind('/') {
        Some(i) => &base[..=i],
        None => "",
    };
    normalize_path(&format!("{}{}", directory, url))
}

fn is_drive_path(url: &str) -> bool {
    let bytes = url.as_bytes();
    bytes.len() > 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' && (bytes[2] == b'\\' || bytes[2] == b'/')
}
