//! Model document parser
//!
//! Builds a [`Model`] from a model document. Structural problems that still
//! leave a usable tree (bad numbers, dangling connection names, unexpected
//! elements) are collected as issues; only an unparseable document or a
//! non-model root element is a hard error.

use tracing::{debug, warn};

use super::{ImportError, ImportResult};
use crate::config::EngineConfig;
use crate::issue::{Issue, IssueKind, ItemRef, Issues, ReferenceRule};
use crate::models::{Component, ComponentId, InterfaceType, Model, Reset, Unit, Units, Variable, When};
use crate::validation::input::{parse_integer, parse_real};
use crate::xml::{CELLML_2_0_NS, XmlDocument, XmlNode};

/// Model document parser
#[derive(Debug, Default)]
pub struct ModelParser {
    config: EngineConfig,
    issues: Issues,
}

impl ModelParser {
    /// Create a new parser with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            config,
            issues: Issues::new(),
        }
    }

    /// Parse a model document
    ///
    /// # Arguments
    ///
    /// * `text` - The document content as a string.
    ///
    /// # Returns
    ///
    /// The model together with every issue found while building it.
    pub fn parse(&mut self, text: &str) -> Result<ImportResult, ImportError> {
        self.issues.clear();

        let doc = XmlDocument::parse(text)?;
        let root = doc
            .root()
            .ok_or_else(|| ImportError::ParseError("Document has no root element".to_string()))?;
        if root.name() != "model" {
            return Err(ImportError::NotAModel(root.name().to_string()));
        }
        if root.namespace() != Some(CELLML_2_0_NS) {
            self.issues.push(Issue::warning(
                IssueKind::Xml,
                ReferenceRule::Xml,
                format!(
                    "Model element is in namespace '{}', expected '{}'",
                    root.namespace().unwrap_or(""),
                    CELLML_2_0_NS
                ),
            ));
        }

        let mut model = Model::new(root.attribute("name").unwrap_or_default());
        let mut encapsulations = Vec::new();
        let mut connections = Vec::new();

        for child in root.element_children() {
            match child.name() {
                "import" => self.parse_import(&mut model, child),
                "units" => self.parse_units(&mut model, child),
                "component" => self.parse_component(&mut model, child),
                "encapsulation" => encapsulations.push(child),
                "connection" => connections.push(child),
                other => self.unexpected_element(other, &ItemRef::Model { name: model.name.clone() }),
            }
        }

        for encapsulation in encapsulations {
            self.parse_encapsulation(&mut model, encapsulation);
        }
        for connection in connections {
            self.parse_connection(&mut model, connection);
        }

        debug!(
            "Parsed model '{}': {} components, {} units, {} import sources",
            model.name,
            model.component_count(),
            model.units().len(),
            model.import_sources().len()
        );

        Ok(ImportResult {
            model,
            issues: std::mem::take(&mut self.issues),
        })
    }

    /// Parse a document and keep only the model
    pub fn parse_model(&mut self, text: &str) -> Result<Model, ImportError> {
        self.parse(text).map(|result| result.model)
    }

    pub fn issues(&self) -> &Issues {
        &self.issues
    }

    fn parse_import(&mut self, model: &mut Model, node: XmlNode<'_>) {
        let href = node.attribute("href").unwrap_or_default();
        if href.is_empty() {
            self.issues.push(
                Issue::error(
                    IssueKind::MissingReference,
                    ReferenceRule::ImportHref,
                    "Import does not have a valid locator xlink:href attribute",
                )
                .with_item(ItemRef::ImportSource { url: String::new() }),
            );
        }
        let source = model.import_source_for_url(href);

        for child in node.element_children() {
            let name = child.attribute("name").unwrap_or_default();
            match child.name() {
                "component" => {
                    let reference = child.attribute("component_ref").unwrap_or_default();
                    model.add_component(Component::new_import(name, source, reference), None);
                }
                "units" => {
                    let reference = child.attribute("units_ref").unwrap_or_default();
                    model.add_units(Units::new_import(name, source, reference));
                }
                other => self.unexpected_element(other, &ItemRef::ImportSource { url: href.to_string() }),
            }
        }
    }

    fn parse_units(&mut self, model: &mut Model, node: XmlNode<'_>) {
        let mut units = Units::new(node.attribute("name").unwrap_or_default());

        for (index, child) in node.element_children().enumerate() {
            if child.name() != "unit" {
                self.unexpected_element(child.name(), &ItemRef::Units { name: units.name.clone() });
                continue;
            }
            let item = ItemRef::Unit {
                units: units.name.clone(),
                index,
            };
            let mut unit = Unit::new(child.attribute("units").unwrap_or_default());
            unit.prefix = child.attribute("prefix").map(str::to_string);
            unit.exponent = self.number(child.attribute("exponent"), &item, ReferenceRule::UnitExponent, "exponent");
            unit.multiplier =
                self.number(child.attribute("multiplier"), &item, ReferenceRule::UnitMultiplier, "multiplier");
            unit.id = child.attribute("id").map(str::to_string);
            units.add_unit(unit);
        }

        model.add_units(units);
    }

    fn parse_component(&mut self, model: &mut Model, node: XmlNode<'_>) {
        let name = node.attribute("name").unwrap_or_default().to_string();
        let id = model.add_component(Component::new(name.clone()), None);

        for child in node.element_children() {
            match child.name() {
                "variable" => self.parse_variable(model, id, &name, child),
                "reset" => {
                    let index = model.component(id).resets().len();
                    let reset = self.parse_reset(child, &ItemRef::Reset { component: name.clone(), index });
                    if let Some(body) = model.component_mut(id).body_mut() {
                        body.resets.push(reset);
                    }
                }
                "math" => model.component_mut(id).append_math(child.source()),
                other => self.unexpected_element(other, &ItemRef::Component { name: name.clone() }),
            }
        }
    }

    fn parse_variable(&mut self, model: &mut Model, component: ComponentId, component_name: &str, node: XmlNode<'_>) {
        let name = node.attribute("name").unwrap_or_default();
        let mut variable = Variable::new(name, node.attribute("units").unwrap_or_default());
        variable.initial_value = node.attribute("initial_value").map(str::to_string);

        if let Some(interface) = node.attribute("interface") {
            match interface.parse::<InterfaceType>() {
                Ok(interface_type) => variable.interface_type = interface_type,
                Err(e) => self.issues.push(
                    Issue::error(IssueKind::InvalidIdentifier, ReferenceRule::VariableInterface, e).with_item(
                        ItemRef::Variable {
                            component: component_name.to_string(),
                            name: name.to_string(),
                        },
                    ),
                ),
            }
        }

        model.add_variable(component, variable);
    }

    fn parse_reset(&mut self, node: XmlNode<'_>, item: &ItemRef) -> Reset {
        let mut reset = Reset {
            variable: node.attribute("variable").map(str::to_string),
            order: self.integer(node.attribute("order"), item, ReferenceRule::ResetOrder),
            whens: Vec::new(),
        };

        for child in node.element_children() {
            if child.name() != "when" {
                self.unexpected_element(child.name(), item);
                continue;
            }
            let mut maths = child.element_children().filter(|c| c.name() == "math");
            reset.whens.push(When {
                order: self.integer(child.attribute("order"), item, ReferenceRule::ResetOrder),
                condition: maths.next().map(|m| m.source().to_string()).unwrap_or_default(),
                value: maths.next().map(|m| m.source().to_string()).unwrap_or_default(),
            });
        }

        reset
    }

    fn parse_encapsulation(&mut self, model: &mut Model, node: XmlNode<'_>) {
        let mut stack: Vec<(XmlNode<'_>, Option<ComponentId>)> =
            node.element_children().map(|c| (c, None)).collect();
        stack.reverse();

        while let Some((child, parent)) = stack.pop() {
            if child.name() != "component_ref" {
                self.unexpected_element(child.name(), &ItemRef::Model { name: model.name.clone() });
                continue;
            }
            let name = child.attribute("component").unwrap_or_default();
            let Some(id) = model.find_component(name) else {
                self.issues.push(
                    Issue::error(
                        IssueKind::MissingReference,
                        ReferenceRule::ComponentName,
                        format!("Encapsulation references component '{}' which does not exist", name),
                    )
                    .with_item(ItemRef::Component { name: name.to_string() }),
                );
                continue;
            };
            if parent.is_some() {
                model.set_parent(id, parent);
            }
            let grandchildren: Vec<_> = child.element_children().collect();
            for grandchild in grandchildren.into_iter().rev() {
                stack.push((grandchild, Some(id)));
            }
        }
    }

    fn parse_connection(&mut self, model: &mut Model, node: XmlNode<'_>) {
        let name_1 = node.attribute("component_1").unwrap_or_default();
        let name_2 = node.attribute("component_2").unwrap_or_default();
        let item = ItemRef::Connection {
            component_1: name_1.to_string(),
            component_2: name_2.to_string(),
        };
        let connection_id = node.attribute("id").map(str::to_string);

        let (Some(component_1), Some(component_2)) = (model.find_component(name_1), model.find_component(name_2))
        else {
            self.issues.push(
                Issue::error(
                    IssueKind::MissingReference,
                    ReferenceRule::ComponentName,
                    format!("Connection references components '{}' and '{}' which do not both exist", name_1, name_2),
                )
                .with_item(item),
            );
            return;
        };

        for map in node.element_children() {
            if map.name() != "map_variables" {
                self.unexpected_element(map.name(), &item);
                continue;
            }
            let variable_1 = map.attribute("variable_1").unwrap_or_default();
            let variable_2 = map.attribute("variable_2").unwrap_or_default();
            match (
                model.component_variable(component_1, variable_1),
                model.component_variable(component_2, variable_2),
            ) {
                (Some(v1), Some(v2)) => {
                    model.add_equivalence_with_ids(v1, v2, map.attribute("id").map(str::to_string), connection_id.clone());
                }
                _ => self.issues.push(
                    Issue::error(
                        IssueKind::MissingReference,
                        ReferenceRule::MapVariablesVariable,
                        format!(
                            "Variables '{}' in component '{}' and '{}' in component '{}' cannot both be found",
                            variable_1, name_1, variable_2, name_2
                        ),
                    )
                    .with_item(item.clone()),
                ),
            }
        }
    }

    fn number(&mut self, text: Option<&str>, item: &ItemRef, rule: ReferenceRule, what: &str) -> f64 {
        let Some(text) = text else {
            return 1.0;
        };
        match parse_real(text) {
            Ok(value) => value,
            Err(e) => {
                warn!("Malformed {} '{}' in {}, using 1.0", what, text, item);
                self.issues.push(
                    Issue::new(
                        self.config.numeric_literals.level(),
                        IssueKind::MalformedNumericLiteral,
                        rule,
                        format!("The {} of {} is not a valid real number: {}", what, item, e),
                    )
                    .with_item(item.clone()),
                );
                1.0
            }
        }
    }

    fn integer(&mut self, text: Option<&str>, item: &ItemRef, rule: ReferenceRule) -> Option<i32> {
        let text = text?;
        match parse_integer(text) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Malformed order '{}' in {}", text, item);
                self.issues.push(
                    Issue::new(
                        self.config.numeric_literals.level(),
                        IssueKind::MalformedNumericLiteral,
                        rule,
                        format!("The order of {} is not a valid integer: {}", item, e),
                    )
                    .with_item(item.clone()),
                );
                None
            }
        }
    }

    fn unexpected_element(&mut self, name: &str, parent: &ItemRef) {
        self.issues.push(
            Issue::warning(
                IssueKind::UnsupportedConstruct,
                ReferenceRule::Xml,
                format!("Element '{}' is not expected in {} and was ignored", name, parent),
            )
            .with_item(parent.clone()),
        );
    }
}
