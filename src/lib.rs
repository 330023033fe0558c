//! CellML SDK - Semantic engine for component-based mathematical models
//!
//! Provides:
//! - Model parsing into an entity graph (components, units, variables)
//! - Import resolution across documents (via storage backends)
//! - Units dimensional equivalence
//! - Units and equivalence cycle detection
//! - Whole-model validation collected as issues
//! - Code generation from MathML for C and Python
//! - JSON export

pub mod config;
pub mod export;
pub mod generator;
pub mod import;
pub mod issue;
pub mod models;
pub mod storage;
pub mod validation;
pub mod xml;

#[cfg(feature = "cli")]
pub mod cli;

// Re-export commonly used types
pub use config::{ConfigError, EngineConfig, LiteralPolicy, ProfileKind};
pub use issue::{Issue, IssueKind, Issues, ItemRef, Level, ReferenceRule};
pub use storage::{FileSystemStorageBackend, InMemoryStorageBackend, StorageBackend, StorageError};
pub use xml::{XmlDocument, XmlError, XmlNode};

pub use export::{EntitySerializer, ExportError, ExportResult, JsonSerializer};
pub use generator::{GeneratedCode, Generator, GeneratorProfile};
pub use import::{ImportError, ImportResolver, ImportResult, ModelParser};
pub use validation::{
    EquivalenceCycle, UnitsComparison, UnitsCycle, ValidationError, Validator, find_equivalence_cycles,
    find_units_cycles, units_are_equivalent, units_names_equivalent,
};

// Re-export models
pub use models::{
    Component, ComponentId, Encapsulation, ImportSource, ImportSourceId, InitialValue, InterfaceType, Model, Reset,
    Unit, Units, UnitsId, Variable, VariableId, When,
};
