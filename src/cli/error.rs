//! CLI error types

use std::path::PathBuf;

use crate::config::ConfigError;
use crate::export::ExportError;
use crate::import::ImportError;
use crate::storage::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("Failed to read {0}: {1}")]
    FileReadError(PathBuf, String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Import(#[from] ImportError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// Checks ran but reported at least one error-level issue
    #[error("{0} error(s) reported")]
    IssuesReported(usize),
}
