//! JSON serializer
//!
//! Writes entities with names in place of arena ids so the output reads on
//! its own. Components nest by encapsulation; import placeholders that were
//! never resolved are written as `{ "name", "import": { "url", "reference" } }`.

use serde_json::{Map, Value, json};

use crate::export::{EntitySerializer, ExportError, ExportResult};
use crate::models::{ComponentDefinition, ComponentId, Model, Reset, Units, UnitsDefinition, VariableId};

/// Serializer for JSON output
#[derive(Debug, Clone, Default)]
pub struct JsonSerializer {
    pretty: bool,
}

impl JsonSerializer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Indented output
    pub fn pretty() -> Self {
        Self { pretty: true }
    }

    fn write(&self, value: &Value) -> Result<String, ExportError> {
        let text = if self.pretty {
            serde_json::to_string_pretty(value)?
        } else {
            serde_json::to_string(value)?
        };
        Ok(text)
    }

    fn check_component(model: &Model, id: ComponentId) -> Result<(), ExportError> {
        if id.0 < model.component_count() {
            Ok(())
        } else {
            Err(ExportError::UnknownEntity(format!("component #{}", id.0)))
        }
    }

    pub fn model_value(model: &Model) -> Value {
        let units: Vec<Value> = model.units().iter().map(|u| Self::units_value(model, u)).collect();
        let components: Vec<Value> = model
            .root_components()
            .iter()
            .map(|id| Self::component_value(model, *id))
            .collect();
        let equivalences: Vec<Value> = model
            .equivalence_tuples()
            .into_iter()
            .map(|tuple| serde_json::to_value(tuple).unwrap_or(Value::Null))
            .collect();
        let imports: Vec<Value> = model
            .import_sources()
            .iter()
            .map(|source| Value::String(source.url.clone()))
            .collect();

        let mut object = Map::new();
        object.insert("name".to_string(), Value::String(model.name.clone()));
        if !imports.is_empty() {
            object.insert("imports".to_string(), Value::Array(imports));
        }
        object.insert("units".to_string(), Value::Array(units));
        object.insert("components".to_string(), Value::Array(components));
        object.insert("equivalences".to_string(), Value::Array(equivalences));
        Value::Object(object)
    }

    pub fn units_value(model: &Model, units: &Units) -> Value {
        match &units.definition {
            UnitsDefinition::Import(import) => json!({
                "name": units.name,
                "import": {
                    "url": model.import_source(import.source).url,
                    "reference": import.reference,
                },
            }),
            UnitsDefinition::Concrete { units: children } => json!({
                "name": units.name,
                "units": children,
            }),
        }
    }

    /// Component with its children nested, built without recursion
    pub fn component_value(model: &Model, id: ComponentId) -> Value {
        // Children are finished before their parents in reverse pre-order
        let order = model.subtree(id);
        let mut finished: Vec<Option<Value>> = vec![None; model.component_count()];
        for current in order.into_iter().rev() {
            let component = model.component(current);
            let mut object = Map::new();
            object.insert("name".to_string(), Value::String(component.name.clone()));

            match &component.definition {
                ComponentDefinition::Import(import) => {
                    object.insert(
                        "import".to_string(),
                        json!({
                            "url": model.import_source(import.source).url,
                            "reference": import.reference,
                        }),
                    );
                }
                ComponentDefinition::Concrete(body) => {
                    let variables: Vec<Value> = body
                        .variables
                        .iter()
                        .map(|v| Self::variable_value(model, *v))
                        .collect();
                    object.insert("variables".to_string(), Value::Array(variables));
                    if !body.resets.is_empty() {
                        let resets = body.resets.iter().map(Self::reset_value).collect();
                        object.insert("resets".to_string(), Value::Array(resets));
                    }
                    if !body.math.trim().is_empty() {
                        object.insert("math".to_string(), Value::String(body.math.clone()));
                    }
                }
            }

            let children: Vec<Value> = component
                .children
                .iter()
                .filter_map(|child| finished[child.0].take())
                .collect();
            if !children.is_empty() {
                object.insert("components".to_string(), Value::Array(children));
            }
            finished[current.0] = Some(Value::Object(object));
        }
        finished[id.0].take().unwrap_or(Value::Null)
    }

    pub fn variable_value(model: &Model, id: VariableId) -> Value {
        let variable = model.variable(id);
        let mut object = Map::new();
        object.insert("name".to_string(), Value::String(variable.name.clone()));
        object.insert("units".to_string(), Value::String(variable.units.clone()));
        if let Some(initial) = &variable.initial_value {
            object.insert("initialValue".to_string(), Value::String(initial.clone()));
        }
        object.insert(
            "interface".to_string(),
            Value::String(variable.interface_type.as_str().to_string()),
        );
        Value::Object(object)
    }

    pub fn reset_value(reset: &Reset) -> Value {
        serde_json::to_value(reset).unwrap_or(Value::Null)
    }
}

impl EntitySerializer for JsonSerializer {
    fn format(&self) -> &str {
        "json"
    }

    fn serialize_model(&self, model: &Model) -> Result<ExportResult, ExportError> {
        Ok(ExportResult {
            content: self.write(&Self::model_value(model))?,
            format: self.format().to_string(),
        })
    }

    fn serialize_units(&self, model: &Model, units: &Units) -> Result<String, ExportError> {
        self.write(&Self::units_value(model, units))
    }

    fn serialize_component(&self, model: &Model, id: ComponentId) -> Result<String, ExportError> {
        Self::check_component(model, id)?;
        self.write(&Self::component_value(model, id))
    }

    fn serialize_variable(&self, model: &Model, id: VariableId) -> Result<String, ExportError> {
        if model.variables().nth(id.0).is_none() {
            return Err(ExportError::UnknownEntity(format!("variable #{}", id.0)));
        }
        self.write(&Self::variable_value(model, id))
    }

    fn serialize_reset(&self, reset: &Reset) -> Result<String, ExportError> {
        Ok(serde_json::to_string(reset)?)
    }

    fn serialize_equivalences(&self, model: &Model) -> Result<String, ExportError> {
        Ok(serde_json::to_string(&model.equivalence_tuples())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Component, Unit, Variable};

    fn sample() -> Model {
        let mut model = Model::new("sample");
        model.add_units(Units::new("ms").with_unit(Unit::new("second").with_prefix("milli")));
        let outer = model.add_component(Component::new("outer"), None);
        let inner = model.add_component(Component::new("inner"), Some(outer));
        let a = model
            .add_variable(outer, Variable::new("a", "ms").with_initial_value("1"))
            .unwrap();
        let b = model.add_variable(inner, Variable::new("b", "ms")).unwrap();
        model.add_equivalence(a, b);
        model
    }

    #[test]
    fn test_model_nests_components() {
        let model = sample();
        let value = JsonSerializer::model_value(&model);

        assert_eq!(value["name"], "sample");
        assert_eq!(value["components"][0]["name"], "outer");
        assert_eq!(value["components"][0]["components"][0]["name"], "inner");
        assert_eq!(value["components"][0]["variables"][0]["initialValue"], "1");
        assert_eq!(value["units"][0]["units"][0]["prefix"], "milli");
        assert_eq!(value["equivalences"].as_array().map(Vec::len), Some(1));
    }

    #[test]
    fn test_unknown_component_is_an_error() {
        let model = sample();
        let result = JsonSerializer::new().serialize_component(&model, ComponentId(7));
        assert!(matches!(result, Err(ExportError::UnknownEntity(_))));
    }

    #[test]
    fn test_equivalences_listed_once() {
        let model = sample();
        let text = JsonSerializer::new().serialize_equivalences(&model).unwrap();
        assert_eq!(text.matches("variable_1").count(), 1);
    }
}
