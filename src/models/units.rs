//! Units model

use super::component::ImportReference;
use super::ImportSourceId;
use serde::{Deserialize, Serialize};

/// One reference inside a units definition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Unit {
    /// Name of a standard unit or of another units in the model
    pub reference: String,
    /// Named SI prefix or integer power of ten
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    pub exponent: f64,
    pub multiplier: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl Unit {
    pub fn new(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            prefix: None,
            exponent: 1.0,
            multiplier: 1.0,
            id: None,
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn with_exponent(mut self, exponent: f64) -> Self {
        self.exponent = exponent;
        self
    }

    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum UnitsDefinition {
    Concrete { units: Vec<Unit> },
    Import(ImportReference),
}

/// Named units definition
///
/// A concrete definition with no unit references declares a new base unit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Units {
    pub name: String,
    pub definition: UnitsDefinition,
}

impl Units {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            definition: UnitsDefinition::Concrete { units: Vec::new() },
        }
    }

    pub fn new_import(name: impl Into<String>, source: ImportSourceId, reference: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            definition: UnitsDefinition::Import(ImportReference {
                source,
                reference: reference.into(),
            }),
        }
    }

    /// Builder-style unit append; ignored on import placeholders
    pub fn with_unit(mut self, unit: Unit) -> Self {
        self.add_unit(unit);
        self
    }

    pub fn add_unit(&mut self, unit: Unit) {
        if let UnitsDefinition::Concrete { units } = &mut self.definition {
            units.push(unit);
        }
    }

    pub fn units(&self) -> &[Unit] {
        match &self.definition {
            UnitsDefinition::Concrete { units } => units,
            UnitsDefinition::Import(_) => &[],
        }
    }

    pub fn is_import(&self) -> bool {
        matches!(self.definition, UnitsDefinition::Import(_))
    }

    pub fn import_reference(&self) -> Option<&ImportReference> {
        match &self.definition {
            UnitsDefinition::Import(import) => Some(import),
            UnitsDefinition::Concrete { .. } => None,
        }
    }

    /// True for a concrete definition without unit references
    pub fn is_base_unit(&self) -> bool {
        matches!(&self.definition, UnitsDefinition::Concrete { units } if units.is_empty())
    }
}
