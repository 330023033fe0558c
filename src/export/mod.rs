//! Export functionality
//!
//! Serializers turn a (resolved) model into text. Each one implements
//! [`EntitySerializer`], which mirrors the entity kinds of the graph:
//! - JSON (`serde_json`)

pub mod json;

use crate::models::{ComponentId, Model, Reset, Units, VariableId};

/// Result of an export operation
#[derive(Debug)]
pub struct ExportResult {
    /// Exported content
    pub content: String,
    /// Format identifier
    pub format: String,
}

/// Error during export
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("Unknown entity: {0}")]
    UnknownEntity(String),
}

impl From<serde_json::Error> for ExportError {
    fn from(err: serde_json::Error) -> Self {
        ExportError::SerializationError(err.to_string())
    }
}

/// Writes entities of a model in some output format
pub trait EntitySerializer {
    /// Format identifier, e.g. `json`
    fn format(&self) -> &str;

    /// Whole model, components nested by encapsulation
    fn serialize_model(&self, model: &Model) -> Result<ExportResult, ExportError>;

    fn serialize_units(&self, model: &Model, units: &Units) -> Result<String, ExportError>;

    /// A component and its encapsulated children
    fn serialize_component(&self, model: &Model, id: ComponentId) -> Result<String, ExportError>;

    fn serialize_variable(&self, model: &Model, id: VariableId) -> Result<String, ExportError>;

    fn serialize_reset(&self, reset: &Reset) -> Result<String, ExportError>;

    /// Every equivalence link once
    fn serialize_equivalences(&self, model: &Model) -> Result<String, ExportError>;
}

pub use json::JsonSerializer;
