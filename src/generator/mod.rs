//! Math compiler
//!
//! Turns the MathML of a component into an expression tree, classifies its
//! variables into states and algebraic variables, captures initial values,
//! and emits code for a [`GeneratorProfile`].
//!
//! # Example
//!
//! ```
//! use cellml_sdk::generator::Generator;
//! use cellml_sdk::import::ModelParser;
//!
//! let text = r#"<model xmlns="http://www.cellml.org/cellml/2.0#" name="decay">
//!   <component name="main">
//!     <variable name="t" units="second"/>
//!     <variable name="y" units="dimensionless" initial_value="1"/>
//!     <variable name="k" units="per_second" initial_value="0.5"/>
//!     <math xmlns="http://www.w3.org/1998/Math/MathML">
//!       <apply><eq/>
//!         <apply><diff/><bvar><ci>t</ci></bvar><ci>y</ci></apply>
//!         <apply><times/><apply><minus/><ci>k</ci></apply><ci>y</ci></apply>
//!       </apply>
//!     </math>
//!   </component>
//!   <units name="per_second"><unit units="second" exponent="-1"/></units>
//! </model>"#;
//!
//! let model = ModelParser::new().parse_model(text).unwrap();
//! let mut generator = Generator::new();
//! let code = generator.generate_code(&model);
//!
//! assert_eq!(generator.states(), ["y"]);
//! assert!(code.implementation.contains("rates[0] = (-algebraic[0])*states[0];"));
//! ```

pub mod ast;
pub mod emitter;
pub mod mathml;
pub mod profile;

pub use ast::{BinaryOp, Expr, NamedConstant, UnaryOp};
pub use emitter::{CodeEmitter, InitialAssignment, InitialSource};
pub use profile::GeneratorProfile;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::issue::{Issue, IssueKind, ItemRef, Issues, Level, ReferenceRule};
use crate::models::{ComponentId, InitialValue, Model};
use crate::xml::XmlDocument;
use mathml::{TreeBuilder, find_voi};

/// The two text blobs produced for a profile
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneratedCode {
    /// Declarations; empty for profiles without a separate interface
    pub interface: String,
    pub implementation: String,
}

/// Code generator for one component at a time
pub struct Generator {
    profile: GeneratorProfile,
    config: EngineConfig,
    component: Option<String>,
    voi: Option<String>,
    states: Vec<String>,
    algebraic: Vec<String>,
    equations: Vec<Expr>,
    initial_values: Vec<InitialAssignment>,
    issues: Issues,
}

impl Default for Generator {
    fn default() -> Self {
        Self::new()
    }
}

impl Generator {
    /// Generator with the C profile and default configuration
    pub fn new() -> Self {
        Self::from_config(EngineConfig::default())
    }

    /// Generator using the profile the configuration names
    pub fn from_config(config: EngineConfig) -> Self {
        Self {
            profile: GeneratorProfile::for_kind(config.profile),
            config,
            component: None,
            voi: None,
            states: Vec::new(),
            algebraic: Vec::new(),
            equations: Vec::new(),
            initial_values: Vec::new(),
            issues: Issues::new(),
        }
    }

    pub fn with_profile(mut self, profile: GeneratorProfile) -> Self {
        self.profile = profile;
        self
    }

    pub fn profile(&self) -> &GeneratorProfile {
        &self.profile
    }

    pub fn set_profile(&mut self, profile: GeneratorProfile) {
        self.profile = profile;
    }

    fn reset(&mut self) {
        self.component = None;
        self.voi = None;
        self.states.clear();
        self.algebraic.clear();
        self.equations.clear();
        self.initial_values.clear();
        self.issues.clear();
    }

    /// Process the first concrete component carrying math, in tree order
    pub fn process_model(&mut self, model: &Model) {
        let target = model.components_in_order().into_iter().find(|id| {
            let component = model.component(*id);
            !component.is_import() && !component.math().trim().is_empty()
        });

        match target {
            Some(id) => self.process_component(model, id),
            None => {
                self.reset();
                self.issues.push(
                    Issue::warning(
                        IssueKind::MissingReference,
                        ReferenceRule::GeneratorEquation,
                        format!("Model '{}' has no component with math to generate code from", model.name),
                    )
                    .with_item(ItemRef::Model {
                        name: model.name.clone(),
                    }),
                );
            }
        }

        info!(
            "Processed model '{}': {} states, {} algebraic variables, {} equations, {} issues",
            model.name,
            self.states.len(),
            self.algebraic.len(),
            self.equations.len(),
            self.issues.len()
        );
    }

    /// Build the expression trees and classification for one component
    pub fn process_component(&mut self, model: &Model, id: ComponentId) {
        self.reset();
        let component = model.component(id);
        self.component = Some(component.name.clone());
        let item = ItemRef::Math {
            component: component.name.clone(),
        };

        let doc = match XmlDocument::parse(component.math()) {
            Ok(doc) => doc,
            Err(e) => {
                self.issues.push(
                    Issue::error(
                        IssueKind::Xml,
                        ReferenceRule::Xml,
                        format!("Math in component '{}' could not be parsed: {}", component.name, e),
                    )
                    .with_item(item),
                );
                return;
            }
        };

        let voi = find_voi(&doc);
        debug!("Component '{}' variable of integration: {:?}", component.name, voi);
        if let Some(name) = &voi
            && model.component_variable(id, name).is_none()
        {
            self.issues.push(
                Issue::error(
                    IssueKind::MissingReference,
                    ReferenceRule::GeneratorVoi,
                    format!(
                        "Variable of integration '{}' is not declared in component '{}'",
                        name, component.name
                    ),
                )
                .with_item(item.clone()),
            );
        }

        let mut builder = TreeBuilder::new(model, id, voi.clone(), self.config.numeric_literals.level());
        for math in doc.top_level().filter(|n| n.is_element("math")) {
            for node in math.element_children() {
                let is_equation = node.is_element("apply")
                    && node.element_children().next().is_some_and(|op| op.name() == "eq");
                let expr = builder.build(node);
                if !is_equation {
                    self.issues.push(
                        Issue::error(
                            IssueKind::UnsupportedConstruct,
                            ReferenceRule::GeneratorEquation,
                            format!("Math in component '{}' has a top-level element that is not an equation", component.name),
                        )
                        .with_item(item.clone()),
                    );
                    continue;
                }
                let assignable = expr
                    .equation_sides()
                    .map(|(lhs, _)| matches!(lhs, Expr::Variable(_) | Expr::Derivative(_)));
                match assignable {
                    Some(true) => self.equations.push(expr),
                    Some(false) => self.issues.push(
                        Issue::error(
                            IssueKind::UnsupportedConstruct,
                            ReferenceRule::GeneratorEquation,
                            format!(
                                "Equation in component '{}' has a left-hand side that is neither a variable nor a derivative",
                                component.name
                            ),
                        )
                        .with_item(item.clone()),
                    ),
                    None => {}
                }
            }
        }

        self.voi = voi;
        self.states = std::mem::take(&mut builder.states);
        self.algebraic = std::mem::take(&mut builder.algebraic);
        self.issues.extend(std::mem::take(&mut builder.issues));
        self.capture_initial_values(model, id);
    }

    fn capture_initial_values(&mut self, model: &Model, id: ComponentId) {
        let component = &model.component(id).name;
        let defined: Vec<&str> = self
            .equations
            .iter()
            .filter_map(|e| match e.equation_sides() {
                Some((Expr::Variable(name), _)) => Some(name.as_str()),
                _ => None,
            })
            .collect();

        let classified: Vec<(String, bool)> = self
            .states
            .iter()
            .map(|s| (s.clone(), true))
            .chain(self.algebraic.iter().map(|a| (a.clone(), false)))
            .collect();

        let mut assignments = Vec::new();
        let mut issues = Vec::new();
        for (name, is_state) in classified {
            let Some(vid) = model.component_variable(id, &name) else {
                continue;
            };
            let variable = model.variable(vid);
            let item = ItemRef::Variable {
                component: component.clone(),
                name: name.clone(),
            };

            let value = match variable.initial() {
                Some(InitialValue::Real(_)) => variable
                    .initial_value
                    .as_deref()
                    .map(|text| InitialSource::Literal(constant_text(text.trim()))),
                Some(InitialValue::Reference(other)) if self.states.contains(&other) || self.algebraic.contains(&other) => {
                    Some(InitialSource::Variable(other))
                }
                Some(InitialValue::Reference(other)) => {
                    let literal = model
                        .component_variable(id, &other)
                        .and_then(|o| model.variable(o).initial_value.as_deref())
                        .filter(|text| matches!(InitialValue::classify(text), InitialValue::Real(_)))
                        .map(|text| InitialSource::Literal(constant_text(text.trim())));
                    if literal.is_none() {
                        issues.push(
                            Issue::error(
                                IssueKind::MissingReference,
                                ReferenceRule::GeneratorInitialValue,
                                format!(
                                    "Variable '{}' in component '{}' is initialised with '{}' which has no value",
                                    name, component, other
                                ),
                            )
                            .with_item(item.clone()),
                        );
                    }
                    literal
                }
                None => {
                    let role = if is_state { "state variable" } else { "variable" };
                    let description = format!("The {} '{}' in component '{}' is not initialised", role, name, component);
                    let issue = if is_state || !defined.contains(&name.as_str()) {
                        Issue::error(IssueKind::MissingReference, ReferenceRule::GeneratorInitialValue, description)
                    } else {
                        // computed by its equation before first use
                        Issue::warning(IssueKind::MissingReference, ReferenceRule::GeneratorInitialValue, description)
                    };
                    issues.push(issue.with_item(item));
                    None
                }
            };

            if let Some(value) = value {
                assignments.push(InitialAssignment { variable: name, value });
            }
        }

        // Declared but absent from the math: no slot, still needs a value
        for vid in model.component(id).variables() {
            let variable = model.variable(*vid);
            let name = &variable.name;
            if self.voi.as_deref() == Some(name.as_str())
                || self.states.contains(name)
                || self.algebraic.contains(name)
                || variable.initial().is_some()
            {
                continue;
            }
            issues.push(
                Issue::error(
                    IssueKind::MissingReference,
                    ReferenceRule::GeneratorInitialValue,
                    format!("The unused variable '{}' in component '{}' is not initialised", name, component),
                )
                .with_item(ItemRef::Variable {
                    component: component.clone(),
                    name: name.clone(),
                }),
            );
        }

        self.initial_values = assignments;
        for issue in issues {
            self.issues.push(issue);
        }
    }

    /// Process `model` and emit code for the current profile
    pub fn generate_code(&mut self, model: &Model) -> GeneratedCode {
        self.process_model(model);
        GeneratedCode {
            interface: self.interface_code(),
            implementation: self.implementation_code(),
        }
    }

    fn emitter(&self) -> CodeEmitter<'_> {
        CodeEmitter {
            profile: &self.profile,
            interface_file_name: &self.config.interface_file_name,
            voi: self.voi.as_deref(),
            states: &self.states,
            algebraic: &self.algebraic,
        }
    }

    /// Declarations for the last processed component
    pub fn interface_code(&self) -> String {
        self.emitter().interface()
    }

    /// Definitions for the last processed component
    pub fn implementation_code(&self) -> String {
        self.emitter().implementation(&self.initial_values, &self.equations)
    }

    /// Name of the processed component
    pub fn component(&self) -> Option<&str> {
        self.component.as_deref()
    }

    /// Variable of integration; empty when none was found
    pub fn voi(&self) -> &str {
        self.voi.as_deref().unwrap_or_default()
    }

    pub fn states(&self) -> &[String] {
        &self.states
    }

    pub fn algebraic(&self) -> &[String] {
        &self.algebraic
    }

    /// Top-level equation nodes in source order
    pub fn equations(&self) -> &[Expr] {
        &self.equations
    }

    pub fn initial_values(&self) -> &[InitialAssignment] {
        &self.initial_values
    }

    pub fn issues(&self) -> &Issues {
        &self.issues
    }

    /// True when the last pass reported no error
    pub fn is_valid(&self) -> bool {
        !self.issues.iter().any(|i| i.level == Level::Error)
    }
}

fn constant_text(text: &str) -> String {
    match Expr::constant(text) {
        Expr::Constant(normalised) => normalised,
        _ => text.to_string(),
    }
}
