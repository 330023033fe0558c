//! Diagnostics collected by the validation, import and generation passes
//!
//! Every pass accumulates [`Issue`] values into an [`Issues`] collector rather
//! than returning on the first problem, so a single call can report many
//! independent findings. Callers decide which levels are fatal.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of an issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Error,
    Warning,
    Message,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Error => write!(f, "error"),
            Level::Warning => write!(f, "warning"),
            Level::Message => write!(f, "message"),
        }
    }
}

/// What went wrong, independent of where
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IssueKind {
    /// Reserved or badly formed name
    InvalidIdentifier,
    /// Dangling units, variable or component name
    MissingReference,
    /// Two connected variables carry incompatible units
    UnitsMismatch,
    /// Equivalence between components that cannot see each other
    InvalidConnection,
    /// Units, equivalence or import chain that closes on itself
    CyclicDependency,
    /// Import document missing or named item absent
    ImportUnavailable,
    /// Math markup the compiler cannot handle
    UnsupportedConstruct,
    /// Numeric text that is not a valid real or integer literal
    MalformedNumericLiteral,
    /// Document is not parseable as an XML tree
    Xml,
}

/// Stable identifier of the modelling rule an issue relates to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReferenceRule {
    ModelName,
    ComponentName,
    UnitsName,
    UnitsStandard,
    UnitReference,
    UnitPrefix,
    UnitCircular,
    UnitExponent,
    UnitMultiplier,
    VariableName,
    VariableUnits,
    VariableInitialValue,
    VariableInterface,
    MapVariablesUnits,
    MapVariablesHierarchy,
    MapVariablesCycle,
    MapVariablesVariable,
    ResetVariable,
    ResetOrder,
    ImportHref,
    ImportReference,
    ImportCycle,
    ImporterMissingFile,
    ImporterNullModel,
    ImporterMissingComponent,
    ImporterMissingUnits,
    MathCiVariable,
    MathCnUnits,
    MathUnsupportedElement,
    MathLiteral,
    GeneratorVoi,
    GeneratorInitialValue,
    GeneratorEquation,
    Xml,
}

impl ReferenceRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferenceRule::ModelName => "model-name",
            ReferenceRule::ComponentName => "component-name",
            ReferenceRule::UnitsName => "units-name",
            ReferenceRule::UnitsStandard => "units-standard",
            ReferenceRule::UnitReference => "unit-reference",
            ReferenceRule::UnitPrefix => "unit-prefix",
            ReferenceRule::UnitCircular => "unit-circular",
            ReferenceRule::UnitExponent => "unit-exponent",
            ReferenceRule::UnitMultiplier => "unit-multiplier",
            ReferenceRule::VariableName => "variable-name",
            ReferenceRule::VariableUnits => "variable-units",
            ReferenceRule::VariableInitialValue => "variable-initial-value",
            ReferenceRule::VariableInterface => "variable-interface",
            ReferenceRule::MapVariablesUnits => "map-variables-units",
            ReferenceRule::MapVariablesHierarchy => "map-variables-hierarchy",
            ReferenceRule::MapVariablesCycle => "map-variables-cycle",
            ReferenceRule::MapVariablesVariable => "map-variables-variable",
            ReferenceRule::ResetVariable => "reset-variable",
            ReferenceRule::ResetOrder => "reset-order",
            ReferenceRule::ImportHref => "import-href",
            ReferenceRule::ImportReference => "import-reference",
            ReferenceRule::ImportCycle => "import-cycle",
            ReferenceRule::ImporterMissingFile => "importer-missing-file",
            ReferenceRule::ImporterNullModel => "importer-null-model",
            ReferenceRule::ImporterMissingComponent => "importer-missing-component",
            ReferenceRule::ImporterMissingUnits => "importer-missing-units",
            ReferenceRule::MathCiVariable => "math-ci-variable",
            ReferenceRule::MathCnUnits => "math-cn-units",
            ReferenceRule::MathUnsupportedElement => "math-unsupported-element",
            ReferenceRule::MathLiteral => "math-literal",
            ReferenceRule::GeneratorVoi => "generator-voi",
            ReferenceRule::GeneratorInitialValue => "generator-initial-value",
            ReferenceRule::GeneratorEquation => "generator-equation",
            ReferenceRule::Xml => "xml",
        }
    }
}

impl fmt::Display for ReferenceRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Locates the entity an issue is about
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ItemRef {
    Model { name: String },
    Component { name: String },
    Units { name: String },
    Unit { units: String, index: usize },
    Variable { component: String, name: String },
    Reset { component: String, index: usize },
    ImportSource { url: String },
    Connection { component_1: String, component_2: String },
    Math { component: String },
}

impl fmt::Display for ItemRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemRef::Model { name } => write!(f, "model '{}'", name),
            ItemRef::Component { name } => write!(f, "component '{}'", name),
            ItemRef::Units { name } => write!(f, "units '{}'", name),
            ItemRef::Unit { units, index } => write!(f, "unit {} of units '{}'", index, units),
            ItemRef::Variable { component, name } => {
                write!(f, "variable '{}' in component '{}'", name, component)
            }
            ItemRef::Reset { component, index } => {
                write!(f, "reset {} in component '{}'", index, component)
            }
            ItemRef::ImportSource { url } => write!(f, "import source '{}'", url),
            ItemRef::Connection {
                component_1,
                component_2,
            } => write!(f, "connection '{}' - '{}'", component_1, component_2),
            ItemRef::Math { component } => write!(f, "math in component '{}'", component),
        }
    }
}

/// A single diagnostic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub level: Level,
    pub kind: IssueKind,
    pub reference_rule: ReferenceRule,
    pub item: Option<ItemRef>,
    pub description: String,
}

impl Issue {
    pub fn new(
        level: Level,
        kind: IssueKind,
        reference_rule: ReferenceRule,
        description: impl Into<String>,
    ) -> Self {
        Self {
            level,
            kind,
            reference_rule,
            item: None,
            description: description.into(),
        }
    }

    pub fn error(kind: IssueKind, rule: ReferenceRule, description: impl Into<String>) -> Self {
        Self::new(Level::Error, kind, rule, description)
    }

    pub fn warning(kind: IssueKind, rule: ReferenceRule, description: impl Into<String>) -> Self {
        Self::new(Level::Warning, kind, rule, description)
    }

    /// Attach the entity this issue is about
    pub fn with_item(mut self, item: ItemRef) -> Self {
        self.item = Some(item);
        self
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} ({})", self.level, self.description, self.reference_rule)
    }
}

/// Per-pass issue collector
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Issues {
    items: Vec<Issue>,
}

impl Issues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, issue: Issue) {
        self.items.push(issue);
    }

    pub fn extend(&mut self, other: Issues) {
        self.items.extend(other.items);
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Issue> {
        self.items.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Issue> {
        self.items.get(index)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Issue> {
        self.items.iter().filter(|i| i.level == Level::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Issue> {
        self.items.iter().filter(|i| i.level == Level::Warning)
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings().count()
    }

    pub fn has_errors(&self) -> bool {
        self.items.iter().any(|i| i.level == Level::Error)
    }

    /// Issues of one kind, in report order
    pub fn of_kind(&self, kind: IssueKind) -> impl Iterator<Item = &Issue> {
        self.items.iter().filter(move |i| i.kind == kind)
    }

    pub fn into_vec(self) -> Vec<Issue> {
        self.items
    }
}

impl<'a> IntoIterator for &'a Issues {
    type Item = &'a Issue;
    type IntoIter = std::slice::Iter<'a, Issue>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_counts() {
        let mut issues = Issues::new();
        issues.push(Issue::error(
            IssueKind::MissingReference,
            ReferenceRule::VariableUnits,
            "Variable 'v' has units 'u' which are not defined",
        ));
        issues.push(Issue::warning(
            IssueKind::UnitsMismatch,
            ReferenceRule::MapVariablesUnits,
            "multiplication factor of 10^3",
        ));

        assert_eq!(issues.len(), 2);
        assert_eq!(issues.error_count(), 1);
        assert_eq!(issues.warning_count(), 1);
        assert!(issues.has_errors());
        assert_eq!(issues.of_kind(IssueKind::UnitsMismatch).count(), 1);
    }

    #[test]
    fn test_display_includes_rule() {
        let issue = Issue::error(
            IssueKind::CyclicDependency,
            ReferenceRule::UnitCircular,
            "Cyclic units exist: 'a' -> 'b' -> 'a'",
        )
        .with_item(ItemRef::Units {
            name: "a".to_string(),
        });

        let text = issue.to_string();
        assert!(text.starts_with("[error]"));
        assert!(text.ends_with("(unit-circular)"));
        assert_eq!(issue.item.map(|i| i.to_string()).as_deref(), Some("units 'a'"));
    }
}
