//! Import functionality
//!
//! - [`ModelParser`]: builds the entity graph from a model document
//! - [`ImportResolver`]: replaces import placeholders with the definitions
//!   they reference, fetching documents through a storage backend

pub mod parser;
pub mod resolver;

use crate::issue::Issues;
use crate::models::Model;
use crate::xml::XmlError;

/// Result of parsing a document
#[derive(Debug)]
pub struct ImportResult {
    /// Entity graph built from the document
    pub model: Model,
    /// Parse errors/warnings
    pub issues: Issues,
}

/// Error during import
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("Not a model document: root element is '{0}'")]
    NotAModel(String),
    #[error("IO error: {0}")]
    IoError(String),
}

impl From<XmlError> for ImportError {
    fn from(e: XmlError) -> Self {
        ImportError::ParseError(e.to_string())
    }
}

pub use parser::ModelParser;
pub use resolver::ImportResolver;
