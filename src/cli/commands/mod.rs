//! Command implementations

pub mod generate;
pub mod resolve;
pub mod validate;

use std::path::Path;

use crate::cli::error::CliError;
use crate::config::EngineConfig;
use crate::import::{ImportResolver, ModelParser};
use crate::issue::Issues;
use crate::models::Model;
use crate::storage::FileSystemStorageBackend;

/// A parsed model with its imports resolved
pub struct LoadedModel {
    pub model: Model,
    /// Parser and resolver issues, in that order
    pub issues: Issues,
}

/// Load configuration from a file, or use defaults
pub fn load_config(path: Option<&Path>) -> Result<EngineConfig, CliError> {
    match path {
        Some(path) => Ok(EngineConfig::load(path)?),
        None => Ok(EngineConfig::default()),
    }
}

/// Parse `input` and resolve its imports relative to its directory
pub fn load_model(input: &Path, config: &EngineConfig) -> Result<LoadedModel, CliError> {
    let text =
        std::fs::read_to_string(input).map_err(|e| CliError::FileReadError(input.to_path_buf(), e.to_string()))?;
    let directory = input
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let file_name = input
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| CliError::InvalidArgument(format!("Not a file path: {}", input.display())))?;

    let result = ModelParser::with_config(config.clone()).parse(&text)?;
    let mut model = result.model;
    let mut issues = result.issues;

    let backend = if config.confine_imports {
        FileSystemStorageBackend::confined(directory)
    } else {
        FileSystemStorageBackend::new(directory)
    };
    let mut resolver = ImportResolver::with_config(backend, config.clone());
    resolver.resolve_imports(&mut model, file_name);
    issues.extend(resolver.take_issues());

    Ok(LoadedModel { model, issues })
}

/// Error when any error-level issue was collected
pub fn check_issues(issues: &Issues) -> Result<(), CliError> {
    match issues.error_count() {
        0 => Ok(()),
        count => Err(CliError::IssuesReported(count)),
    }
}
