//! Whole-model validation
//!
//! One pass over a model collecting every rule violation it can find:
//! names, units references and prefixes, variables and their initial
//! values, resets, math, equivalence hierarchy and units, and both kinds of
//! cycles.

use std::collections::HashSet;

use tracing::info;

use super::cycles::{find_equivalence_cycles, find_units_cycles};
use super::input::{is_integer_literal, validate_identifier, validate_units_name};
use super::units::units_are_equivalent;
use crate::config::EngineConfig;
use crate::generator::mathml::{is_supported_element, literal_text};
use crate::issue::{Issue, IssueKind, ItemRef, Issues, Level, ReferenceRule};
use crate::models::standard_units::{is_standard_unit, prefix_exponent};
use crate::models::{ComponentId, Encapsulation, InitialValue, Model, Reset};
use crate::xml::{MATHML_NS, XmlDocument};

/// Model validator
pub struct Validator {
    config: EngineConfig,
    issues: Issues,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

impl Validator {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            config,
            issues: Issues::new(),
        }
    }

    /// Validate `model`, replacing the issues of any previous call
    ///
    /// Returns `true` when no error-level issue was found.
    pub fn validate_model(&mut self, model: &Model) -> bool {
        self.issues.clear();

        if let Err(e) = validate_identifier(&model.name, "model name") {
            self.report(
                Level::Error,
                IssueKind::InvalidIdentifier,
                ReferenceRule::ModelName,
                ItemRef::Model {
                    name: model.name.clone(),
                },
                format!("Model '{}' does not have a valid name: {}", model.name, e),
            );
        }

        self.validate_units(model);
        self.validate_components(model);
        self.validate_equivalences(model);

        info!(
            "Validated model '{}': {} errors, {} warnings",
            model.name,
            self.issues.error_count(),
            self.issues.warning_count()
        );
        !self.issues.has_errors()
    }

    pub fn issues(&self) -> &Issues {
        &self.issues
    }

    pub fn take_issues(&mut self) -> Issues {
        std::mem::take(&mut self.issues)
    }

    fn report(&mut self, level: Level, kind: IssueKind, rule: ReferenceRule, item: ItemRef, description: String) {
        self.issues.push(Issue::new(level, kind, rule, description).with_item(item));
    }

    fn validate_units(&mut self, model: &Model) {
        let mut names = HashSet::new();
        for units in model.units() {
            let item = ItemRef::Units {
                name: units.name.clone(),
            };

            if let Err(e) = validate_units_name(&units.name) {
                let rule = if is_standard_unit(&units.name) {
                    ReferenceRule::UnitsStandard
                } else {
                    ReferenceRule::UnitsName
                };
                self.report(
                    Level::Error,
                    IssueKind::InvalidIdentifier,
                    rule,
                    item.clone(),
                    format!("Units '{}' does not have a valid name: {}", units.name, e),
                );
            }
            if !units.name.is_empty() && !names.insert(units.name.as_str()) {
                self.report(
                    Level::Error,
                    IssueKind::InvalidIdentifier,
                    ReferenceRule::UnitsName,
                    item.clone(),
                    format!("Model '{}' contains multiple units named '{}'", model.name, units.name),
                );
            }

            if let Some(import) = units.import_reference() {
                let url = model.import_source(import.source).url.clone();
                self.validate_import(&item, &import.reference, &url, "units_ref");
                continue;
            }

            for (index, unit) in units.units().iter().enumerate() {
                let unit_item = ItemRef::Unit {
                    units: units.name.clone(),
                    index,
                };
                if !is_standard_unit(&unit.reference) && !model.has_units(&unit.reference) {
                    self.report(
                        Level::Error,
                        IssueKind::MissingReference,
                        ReferenceRule::UnitReference,
                        unit_item.clone(),
                        format!(
                            "Units reference '{}' in units '{}' is not a valid reference to a local units or a standard unit type",
                            unit.reference, units.name
                        ),
                    );
                }
                if let Some(prefix) = &unit.prefix
                    && prefix_exponent(prefix).is_none()
                {
                    let detail = if is_integer_literal(prefix.trim()) {
                        "is out of the integer range"
                    } else {
                        "is not a valid integer or an SI prefix"
                    };
                    self.report(
                        Level::Error,
                        IssueKind::MalformedNumericLiteral,
                        ReferenceRule::UnitPrefix,
                        unit_item.clone(),
                        format!("Prefix '{}' of unit '{}' {}", prefix, unit.reference, detail),
                    );
                }
                if !unit.exponent.is_finite() {
                    self.report(
                        Level::Error,
                        IssueKind::MalformedNumericLiteral,
                        ReferenceRule::UnitExponent,
                        unit_item.clone(),
                        format!("Exponent of unit '{}' is not a finite number", unit.reference),
                    );
                }
                if !unit.multiplier.is_finite() || unit.multiplier <= 0.0 {
                    self.report(
                        Level::Error,
                        IssueKind::MalformedNumericLiteral,
                        ReferenceRule::UnitMultiplier,
                        unit_item,
                        format!(
                            "Multiplier '{}' of unit '{}' must be a positive finite number",
                            unit.multiplier, unit.reference
                        ),
                    );
                }
            }
        }

        for cycle in find_units_cycles(model) {
            let name = cycle.path[0].clone();
            self.report(
                Level::Error,
                IssueKind::CyclicDependency,
                ReferenceRule::UnitCircular,
                ItemRef::Units { name },
                format!("Cyclic units exist: {}", cycle.description()),
            );
        }
    }

    fn validate_import(&mut self, item: &ItemRef, reference: &str, url: &str, attribute: &str) {
        if url.trim().is_empty() {
            self.report(
                Level::Error,
                IssueKind::MissingReference,
                ReferenceRule::ImportHref,
                item.clone(),
                format!("Imported {} does not have a valid locator xlink:href attribute", item),
            );
        }
        if reference.trim().is_empty() {
            self.report(
                Level::Error,
                IssueKind::MissingReference,
                ReferenceRule::ImportReference,
                item.clone(),
                format!("Imported {} does not have a valid {} attribute", item, attribute),
            );
        } else if let Err(e) = validate_identifier(reference, "import reference") {
            self.report(
                Level::Error,
                IssueKind::InvalidIdentifier,
                ReferenceRule::ImportReference,
                item.clone(),
                format!("Imported {} has an invalid {} '{}': {}", item, attribute, reference, e),
            );
        }
    }

    fn validate_components(&mut self, model: &Model) {
        let mut names = HashSet::new();
        for id in model.components_in_order() {
            let component = model.component(id);
            let item = ItemRef::Component {
                name: component.name.clone(),
            };

            if let Err(e) = validate_identifier(&component.name, "component name") {
                self.report(
                    Level::Error,
                    IssueKind::InvalidIdentifier,
                    ReferenceRule::ComponentName,
                    item.clone(),
                    format!("Component '{}' does not have a valid name: {}", component.name, e),
                );
            }
            if !component.name.is_empty() && !names.insert(component.name.as_str()) {
                self.report(
                    Level::Error,
                    IssueKind::InvalidIdentifier,
                    ReferenceRule::ComponentName,
                    item.clone(),
                    format!("Model '{}' contains multiple components named '{}'", model.name, component.name),
                );
            }

            if let Some(import) = component.import_reference() {
                let url = model.import_source(import.source).url.clone();
                self.validate_import(&item, &import.reference, &url, "component_ref");
                continue;
            }

            self.validate_variables(model, id);
            for (index, reset) in component.resets().iter().enumerate() {
                self.validate_reset(model, id, index, reset);
            }
            let math = component.math().to_string();
            self.validate_math(model, id, &math);
        }
    }

    fn validate_variables(&mut self, model: &Model, component: ComponentId) {
        let owner = &model.component(component).name;
        let mut names = HashSet::new();
        for vid in model.component(component).variables() {
            let variable = model.variable(*vid);
            let item = ItemRef::Variable {
                component: owner.clone(),
                name: variable.name.clone(),
            };

            if let Err(e) = validate_identifier(&variable.name, "variable name") {
                self.report(
                    Level::Error,
                    IssueKind::InvalidIdentifier,
                    ReferenceRule::VariableName,
                    item.clone(),
                    format!("Variable '{}' in component '{}' does not have a valid name: {}", variable.name, owner, e),
                );
            }
            if !variable.name.is_empty() && !names.insert(variable.name.as_str()) {
                self.report(
                    Level::Error,
                    IssueKind::InvalidIdentifier,
                    ReferenceRule::VariableName,
                    item.clone(),
                    format!("Component '{}' contains multiple variables named '{}'", owner, variable.name),
                );
            }

            if variable.units.is_empty() {
                self.report(
                    Level::Error,
                    IssueKind::MissingReference,
                    ReferenceRule::VariableUnits,
                    item.clone(),
                    format!("Variable '{}' in component '{}' does not have any units specified", variable.name, owner),
                );
            } else if !is_standard_unit(&variable.units) && !model.has_units(&variable.units) {
                self.report(
                    Level::Error,
                    IssueKind::MissingReference,
                    ReferenceRule::VariableUnits,
                    item.clone(),
                    format!(
                        "Variable '{}' in component '{}' has units of '{}' which do not correspond with any units defined in the model or the standard units",
                        variable.name, owner, variable.units
                    ),
                );
            }

            if let Some(InitialValue::Reference(name)) = variable.initial()
                && model.component_variable(component, &name).is_none()
            {
                self.report(
                    Level::Error,
                    IssueKind::MissingReference,
                    ReferenceRule::VariableInitialValue,
                    item,
                    format!(
                        "Variable '{}' in component '{}' has an invalid initial value '{}'. Initial values must be a real number string or a variable reference",
                        variable.name, owner, name
                    ),
                );
            }
        }
    }

    fn validate_reset(&mut self, model: &Model, component: ComponentId, index: usize, reset: &Reset) {
        let owner = model.component(component).name.clone();
        let item = ItemRef::Reset {
            component: owner.clone(),
            index,
        };

        match &reset.variable {
            None => self.report(
                Level::Error,
                IssueKind::MissingReference,
                ReferenceRule::ResetVariable,
                item.clone(),
                format!("Reset {} in component '{}' does not reference a variable", index, owner),
            ),
            Some(name) if model.component_variable(component, name).is_none() => self.report(
                Level::Error,
                IssueKind::MissingReference,
                ReferenceRule::ResetVariable,
                item.clone(),
                format!(
                    "Reset {} in component '{}' references variable '{}' which is not in that component",
                    index, owner, name
                ),
            ),
            Some(_) => {}
        }

        if reset.order.is_none() {
            self.report(
                Level::Error,
                IssueKind::MissingReference,
                ReferenceRule::ResetOrder,
                item.clone(),
                format!("Reset {} in component '{}' does not have an order set", index, owner),
            );
        }
        for (position, when) in reset.whens.iter().enumerate() {
            if when.order.is_none() {
                self.report(
                    Level::Error,
                    IssueKind::MissingReference,
                    ReferenceRule::ResetOrder,
                    item.clone(),
                    format!("When {} of reset {} in component '{}' does not have an order set", position, index, owner),
                );
            }
            self.validate_math(model, component, &when.condition);
            self.validate_math(model, component, &when.value);
        }
    }

    fn validate_math(&mut self, model: &Model, component: ComponentId, math: &str) {
        if math.trim().is_empty() {
            return;
        }
        let owner = model.component(component).name.clone();
        let item = ItemRef::Math {
            component: owner.clone(),
        };

        let doc = match XmlDocument::parse(math) {
            Ok(doc) => doc,
            Err(e) => {
                self.report(
                    Level::Error,
                    IssueKind::Xml,
                    ReferenceRule::Xml,
                    item,
                    format!("Math in component '{}' could not be parsed: {}", owner, e),
                );
                return;
            }
        };

        let nodes: Vec<_> = doc
            .top_level()
            .flat_map(|top| std::iter::once(top).chain(top.descendants()))
            .filter(|node| node.kind() == crate::xml::XmlNodeKind::Element)
            .collect();

        let bound: HashSet<String> = nodes
            .iter()
            .filter(|node| node.is_element("bvar"))
            .flat_map(|node| node.element_children())
            .filter(|node| node.is_element("ci"))
            .map(|node| node.text().trim().to_string())
            .collect();

        for node in nodes {
            if node.namespace().is_some_and(|ns| ns != MATHML_NS) {
                continue;
            }
            match node.name() {
                "ci" => {
                    let name = node.text().trim().to_string();
                    if model.component_variable(component, &name).is_none() && !bound.contains(&name) {
                        self.report(
                            Level::Error,
                            IssueKind::MissingReference,
                            ReferenceRule::MathCiVariable,
                            item.clone(),
                            format!(
                                "MathML ci element has the child text '{}' which does not correspond with any variable names present in component '{}'",
                                name, owner
                            ),
                        );
                    }
                }
                "cn" => {
                    if let Some(units) = node.attribute("units")
                        && !is_standard_unit(units)
                        && !model.has_units(units)
                    {
                        self.report(
                            Level::Error,
                            IssueKind::MissingReference,
                            ReferenceRule::MathCnUnits,
                            item.clone(),
                            format!(
                                "Math cn element with the value '{}' has units '{}' which are not defined in the model",
                                node.text().trim(),
                                units
                            ),
                        );
                    }
                    if let Err(text) = literal_text(node) {
                        self.report(
                            self.config.numeric_literals.level(),
                            IssueKind::MalformedNumericLiteral,
                            ReferenceRule::MathLiteral,
                            item.clone(),
                            format!("Math cn element in component '{}' has the invalid value '{}'", owner, text),
                        );
                    }
                }
                name if !is_supported_element(name) => {
                    self.report(
                        Level::Error,
                        IssueKind::UnsupportedConstruct,
                        ReferenceRule::MathUnsupportedElement,
                        item.clone(),
                        format!("Math has a '{}' element that is not a supported MathML element", name),
                    );
                }
                _ => {}
            }
        }
    }

    fn validate_equivalences(&mut self, model: &Model) {
        for (id, variable) in model.variables() {
            for link in &variable.equivalences {
                if link.variable < id {
                    continue;
                }
                let other = model.variable(link.variable);
                let c1 = &model.component(variable.component).name;
                let c2 = &model.component(other.component).name;
                let item = ItemRef::Connection {
                    component_1: c1.clone(),
                    component_2: c2.clone(),
                };

                match model.encapsulation_relation(variable.component, other.component) {
                    Encapsulation::Siblings | Encapsulation::ParentChild => {}
                    Encapsulation::Same => self.report(
                        Level::Error,
                        IssueKind::InvalidConnection,
                        ReferenceRule::MapVariablesVariable,
                        item.clone(),
                        format!(
                            "Variable '{}' is equivalent to variable '{}' in the same component '{}'",
                            variable.name, other.name, c1
                        ),
                    ),
                    Encapsulation::Unrelated => self.report(
                        Level::Error,
                        IssueKind::InvalidConnection,
                        ReferenceRule::MapVariablesHierarchy,
                        item.clone(),
                        format!(
                            "Variable '{}' in component '{}' is equivalent to variable '{}' in component '{}' but the components are not siblings or parent and child",
                            variable.name, c1, other.name, c2
                        ),
                    ),
                }

                let comparison = units_are_equivalent(model, id, link.variable);
                if !comparison.equivalent {
                    let level = if comparison.dimensionally_equivalent {
                        Level::Warning
                    } else {
                        Level::Error
                    };
                    self.report(
                        level,
                        IssueKind::UnitsMismatch,
                        ReferenceRule::MapVariablesUnits,
                        item,
                        format!(
                            "Variable '{}' in component '{}' has units of '{}' and an equivalent variable '{}' in component '{}' with non-matching units of '{}'. The mismatch is: {}",
                            variable.name, c1, variable.units, other.name, c2, other.units, comparison.hint
                        ),
                    );
                }
            }
        }

        for cycle in find_equivalence_cycles(model) {
            let first = model.variable(cycle.variables[0]);
            self.report(
                Level::Error,
                IssueKind::CyclicDependency,
                ReferenceRule::MapVariablesCycle,
                ItemRef::Variable {
                    component: model.component(first.component).name.clone(),
                    name: first.name.clone(),
                },
                format!("Cyclic variable equivalences exist: {}", cycle.description(model)),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::ModelParser;

    const MATH_NS: &str = "http://www.w3.org/1998/Math/MathML";

    fn parse(body: &str) -> Model {
        let text = format!(
            r#"<model xmlns="http://www.cellml.org/cellml/2.0#" name="test">{}</model>"#,
            body
        );
        ModelParser::new().parse_model(&text).unwrap()
    }

    #[test]
    fn test_undeclared_ci_is_reported_by_name() {
        let model = parse(&format!(
            r#"<component name="c">
                 <variable name="a" units="second"/>
                 <variable name="b" units="second"/>
                 <math xmlns="{}"><apply><eq/><ci>x</ci><apply><plus/><ci>a</ci><ci>b</ci></apply></apply></math>
               </component>"#,
            MATH_NS
        ));
        let mut validator = Validator::new();
        assert!(!validator.validate_model(&model));

        let issues: Vec<_> = validator.issues().of_kind(IssueKind::MissingReference).collect();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].reference_rule, ReferenceRule::MathCiVariable);
        assert!(issues[0].description.contains("'x'"));
    }

    #[test]
    fn test_prefix_mismatch_is_a_warning() {
        let model = parse(
            r#"<units name="millivolt"><unit units="volt" prefix="milli"/></units>
               <component name="a"><variable name="v" units="millivolt" interface="public"/></component>
               <component name="b"><variable name="v" units="volt" interface="public"/></component>
               <connection component_1="a" component_2="b"><map_variables variable_1="v" variable_2="v"/></connection>"#,
        );
        let mut validator = Validator::new();
        assert!(validator.validate_model(&model));

        let warning = validator.issues().warnings().next().unwrap();
        assert_eq!(warning.kind, IssueKind::UnitsMismatch);
        assert!(warning.description.ends_with("multiplication factor of 10^-3"));
    }

    #[test]
    fn test_units_rules() {
        let model = parse(
            r#"<units name="second"/>
               <units name="bad"><unit units="furlong" prefix="mega_"/></units>
               <units name="a"><unit units="b"/></units>
               <units name="b"><unit units="a"/></units>"#,
        );
        let mut validator = Validator::new();
        assert!(!validator.validate_model(&model));

        let rules: Vec<ReferenceRule> = validator.issues().iter().map(|i| i.reference_rule).collect();
        assert!(rules.contains(&ReferenceRule::UnitsStandard));
        assert!(rules.contains(&ReferenceRule::UnitReference));
        assert!(rules.contains(&ReferenceRule::UnitPrefix));
        assert_eq!(rules.iter().filter(|r| **r == ReferenceRule::UnitCircular).count(), 2);
    }

    #[test]
    fn test_unrelated_components_cannot_connect() {
        let model = parse(
            r#"<component name="p"/><component name="q"/><component name="r"/>
               <component name="x"><variable name="v" units="second" interface="public"/></component>
               <component name="y"><variable name="v" units="second" interface="public"/></component>
               <encapsulation>
                 <component_ref component="p"><component_ref component="x"/></component_ref>
                 <component_ref component="q"><component_ref component="y"/></component_ref>
               </encapsulation>
               <connection component_1="x" component_2="y"><map_variables variable_1="v" variable_2="v"/></connection>"#,
        );
        let mut validator = Validator::new();
        validator.validate_model(&model);
        assert_eq!(validator.issues().of_kind(IssueKind::InvalidConnection).count(), 1);
    }

    #[test]
    fn test_reset_and_initial_value_references() {
        let model = parse(
            r#"<component name="c">
                 <variable name="v" units="second" initial_value="w"/>
                 <reset variable="missing"/>
               </component>"#,
        );
        let mut validator = Validator::new();
        validator.validate_model(&model);

        let rules: Vec<ReferenceRule> = validator.issues().iter().map(|i| i.reference_rule).collect();
        assert!(rules.contains(&ReferenceRule::VariableInitialValue));
        assert!(rules.contains(&ReferenceRule::ResetVariable));
        assert!(rules.contains(&ReferenceRule::ResetOrder));
    }
}
