//! Variable model and equivalence links

use super::{ComponentId, VariableId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Interface tag of a variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterfaceType {
    #[default]
    None,
    Public,
    Private,
    PublicAndPrivate,
}

impl InterfaceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InterfaceType::None => "none",
            InterfaceType::Public => "public",
            InterfaceType::Private => "private",
            InterfaceType::PublicAndPrivate => "public_and_private",
        }
    }
}

impl fmt::Display for InterfaceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InterfaceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(InterfaceType::None),
            "public" => Ok(InterfaceType::Public),
            "private" => Ok(InterfaceType::Private),
            "public_and_private" => Ok(InterfaceType::PublicAndPrivate),
            other => Err(format!("Unknown interface type: {}", other)),
        }
    }
}

/// Interpretation of an initial value attribute
#[derive(Debug, Clone, PartialEq)]
pub enum InitialValue {
    /// Real number literal
    Real(f64),
    /// Name of another variable in the same component
    Reference(String),
}

impl InitialValue {
    pub fn classify(text: &str) -> Self {
        match crate::validation::input::parse_real(text) {
            Ok(value) => InitialValue::Real(value),
            Err(_) => InitialValue::Reference(text.trim().to_string()),
        }
    }
}

/// One side of a symmetric equivalence link
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Equivalence {
    pub variable: VariableId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mapping_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Variable {
    pub name: String,
    pub units: String,
    /// Real literal or name of another variable in the same component
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_value: Option<String>,
    #[serde(default)]
    pub interface_type: InterfaceType,
    pub component: ComponentId,
    #[serde(default)]
    pub equivalences: Vec<Equivalence>,
}

impl Variable {
    /// Detached variable; the owning component is set when it is added to a model
    pub fn new(name: impl Into<String>, units: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            units: units.into(),
            initial_value: None,
            interface_type: InterfaceType::None,
            component: ComponentId(0),
            equivalences: Vec::new(),
        }
    }

    pub fn with_initial_value(mut self, value: impl Into<String>) -> Self {
        self.initial_value = Some(value.into());
        self
    }

    pub fn with_interface(mut self, interface_type: InterfaceType) -> Self {
        self.interface_type = interface_type;
        self
    }

    pub fn initial(&self) -> Option<InitialValue> {
        self.initial_value.as_deref().map(InitialValue::classify)
    }

    pub fn is_equivalent_to(&self, other: VariableId) -> bool {
        self.equivalences.iter().any(|e| e.variable == other)
    }
}

/// A link as handed to serializers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EquivalenceTuple {
    /// `(component name, variable name)`
    pub variable_1: (String, String),
    pub variable_2: (String, String),
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mapping_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interface_type_round_trip_names() {
        for text in ["none", "public", "private", "public_and_private"] {
            let parsed: InterfaceType = text.parse().unwrap();
            assert_eq!(parsed.as_str(), text);
        }
        assert!("both".parse::<InterfaceType>().is_err());
    }

    #[test]
    fn test_initial_value_classification() {
        assert_eq!(InitialValue::classify("-1.5e3"), InitialValue::Real(-1500.0));
        assert_eq!(InitialValue::classify(" V_init "), InitialValue::Reference("V_init".to_string()));

        let v = Variable::new("V", "millivolt").with_initial_value("0");
        assert_eq!(v.initial(), Some(InitialValue::Real(0.0)));
    }
}
