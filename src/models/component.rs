//! Component model

use super::{ComponentId, ImportSourceId, VariableId};
use serde::{Deserialize, Serialize};

/// Reference from a placeholder to a named item inside another document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImportReference {
    pub source: ImportSourceId,
    pub reference: String,
}

/// A `when` trigger of a reset
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct When {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<i32>,
    pub condition: String,
    pub value: String,
}

/// Reset attached to a component
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Reset {
    /// Name of the controlled variable in the owning component
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variable: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<i32>,
    #[serde(default)]
    pub whens: Vec<When>,
}

impl Reset {
    pub fn new(variable: impl Into<String>, order: i32) -> Self {
        Self {
            variable: Some(variable.into()),
            order: Some(order),
            whens: Vec::new(),
        }
    }
}

/// Content of a natively defined component
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ComponentBody {
    #[serde(default)]
    pub variables: Vec<VariableId>,
    #[serde(default)]
    pub resets: Vec<Reset>,
    /// Concatenation of every `<math>` fragment of the component
    #[serde(default)]
    pub math: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ComponentDefinition {
    Concrete(ComponentBody),
    Import(ImportReference),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Component {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<ComponentId>,
    #[serde(default)]
    pub children: Vec<ComponentId>,
    pub definition: ComponentDefinition,
}

impl Component {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            children: Vec::new(),
            definition: ComponentDefinition::Concrete(ComponentBody::default()),
        }
    }

    pub fn new_import(name: impl Into<String>, source: ImportSourceId, reference: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            children: Vec::new(),
            definition: ComponentDefinition::Import(ImportReference {
                source,
                reference: reference.into(),
            }),
        }
    }

    pub fn is_import(&self) -> bool {
        matches!(self.definition, ComponentDefinition::Import(_))
    }

    pub fn import_reference(&self) -> Option<&ImportReference> {
        match &self.definition {
            ComponentDefinition::Import(import) => Some(import),
            ComponentDefinition::Concrete(_) => None,
        }
    }

    pub fn body(&self) -> Option<&ComponentBody> {
        match &self.definition {
            ComponentDefinition::Concrete(body) => Some(body),
            ComponentDefinition::Import(_) => None,
        }
    }

    pub fn body_mut(&mut self) -> Option<&mut ComponentBody> {
        match &mut self.definition {
            ComponentDefinition::Concrete(body) => Some(body),
            ComponentDefinition::Import(_) => None,
        }
    }

    /// Variables of a concrete component; empty for placeholders
    pub fn variables(&self) -> &[VariableId] {
        self.body().map(|b| b.variables.as_slice()).unwrap_or(&[])
    }

    pub fn math(&self) -> &str {
        self.body().map(|b| b.math.as_str()).unwrap_or("")
    }

    /// Append a math fragment to a concrete component
    pub fn append_math(&mut self, math: &str) {
        if let Some(body) = self.body_mut() {
            body.math.push_str(math);
        }
    }

    pub fn resets(&self) -> &[Reset] {
        self.body().map(|b| b.resets.as_slice()).unwrap_or(&[])
    }
}
