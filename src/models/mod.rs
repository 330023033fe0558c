//! Entity graph
//!
//! A [`Model`] owns arenas of components, variables, units and import
//! sources. Ownership edges (model to component, component to variable) are
//! index lists; back-references (variable to component, variable to
//! equivalent variable) are plain ids resolved through the arena.

pub mod component;
pub mod standard_units;
pub mod units;
pub mod variable;

pub use component::{Component, ComponentBody, ComponentDefinition, ImportReference, Reset, When};
pub use units::{Unit, Units, UnitsDefinition};
pub use variable::{Equivalence, EquivalenceTuple, InitialValue, InterfaceType, Variable};

use serde::{Deserialize, Serialize};
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariableId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitsId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImportSourceId(pub usize);

/// A document URL and the model fetched from it, shared by every
/// placeholder importing from that URL
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ImportSource {
    pub url: String,
    #[serde(skip)]
    pub model: Option<Rc<Model>>,
}

/// How two components sit relative to each other in the encapsulation tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encapsulation {
    Same,
    Siblings,
    ParentChild,
    Unrelated,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Model {
    pub name: String,
    components: Vec<Component>,
    variables: Vec<Variable>,
    units: Vec<Units>,
    import_sources: Vec<ImportSource>,
    root_components: Vec<ComponentId>,
}

impl Model {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    // Components

    /// Add a component under `parent`, or at the top level
    pub fn add_component(&mut self, mut component: Component, parent: Option<ComponentId>) -> ComponentId {
        let id = ComponentId(self.components.len());
        component.parent = parent;
        component.children.clear();
        self.components.push(component);
        match parent {
            Some(p) => self.components[p.0].children.push(id),
            None => self.root_components.push(id),
        }
        id
    }

    /// Move a component under a new parent, or back to the top level
    pub fn set_parent(&mut self, child: ComponentId, parent: Option<ComponentId>) {
        if Some(child) == parent {
            return;
        }
        match self.components[child.0].parent {
            Some(old) => self.components[old.0].children.retain(|c| *c != child),
            None => self.root_components.retain(|c| *c != child),
        }
        self.components[child.0].parent = parent;
        match parent {
            Some(p) => self.components[p.0].children.push(child),
            None => self.root_components.push(child),
        }
    }

    pub fn component(&self, id: ComponentId) -> &Component {
        &self.components[id.0]
    }

    pub fn component_mut(&mut self, id: ComponentId) -> &mut Component {
        &mut self.components[id.0]
    }

    /// Every component with its id, in creation order
    pub fn components(&self) -> impl Iterator<Item = (ComponentId, &Component)> {
        self.components.iter().enumerate().map(|(i, c)| (ComponentId(i), c))
    }

    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    pub fn root_components(&self) -> &[ComponentId] {
        &self.root_components
    }

    /// Pre-order walk of the encapsulation tree starting at `root`
    pub fn subtree(&self, root: ComponentId) -> Vec<ComponentId> {
        let mut order = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            order.push(id);
            for child in self.components[id.0].children.iter().rev() {
                stack.push(*child);
            }
        }
        order
    }

    /// Pre-order walk of every top-level tree
    pub fn components_in_order(&self) -> Vec<ComponentId> {
        self.root_components
            .iter()
            .flat_map(|root| self.subtree(*root))
            .collect()
    }

    /// First component with this name, searching the whole tree depth-first
    pub fn find_component(&self, name: &str) -> Option<ComponentId> {
        self.components_in_order()
            .into_iter()
            .find(|id| self.components[id.0].name == name)
    }

    pub fn encapsulation_relation(&self, a: ComponentId, b: ComponentId) -> Encapsulation {
        let pa = self.components[a.0].parent;
        let pb = self.components[b.0].parent;
        if a == b {
            Encapsulation::Same
        } else if pa == pb {
            Encapsulation::Siblings
        } else if pa == Some(b) || pb == Some(a) {
            Encapsulation::ParentChild
        } else {
            Encapsulation::Unrelated
        }
    }

    // Variables

    /// Add a variable to a concrete component; placeholders cannot own variables
    pub fn add_variable(&mut self, component: ComponentId, mut variable: Variable) -> Option<VariableId> {
        let id = VariableId(self.variables.len());
        let body = self.components[component.0].body_mut()?;
        body.variables.push(id);
        variable.component = component;
        variable.equivalences.clear();
        self.variables.push(variable);
        Some(id)
    }

    pub fn variable(&self, id: VariableId) -> &Variable {
        &self.variables[id.0]
    }

    pub fn variable_mut(&mut self, id: VariableId) -> &mut Variable {
        &mut self.variables[id.0]
    }

    pub fn variables(&self) -> impl Iterator<Item = (VariableId, &Variable)> {
        self.variables.iter().enumerate().map(|(i, v)| (VariableId(i), v))
    }

    pub fn component_variable(&self, component: ComponentId, name: &str) -> Option<VariableId> {
        self.components[component.0]
            .variables()
            .iter()
            .copied()
            .find(|v| self.variables[v.0].name == name)
    }

    /// Link two variables in both directions. Returns false for self-links
    /// and links that already exist.
    pub fn add_equivalence(&mut self, a: VariableId, b: VariableId) -> bool {
        self.add_equivalence_with_ids(a, b, None, None)
    }

    pub fn add_equivalence_with_ids(
        &mut self,
        a: VariableId,
        b: VariableId,
        mapping_id: Option<String>,
        connection_id: Option<String>,
    ) -> bool {
        if a == b || self.variables[a.0].is_equivalent_to(b) {
            return false;
        }
        self.variables[a.0].equivalences.push(Equivalence {
            variable: b,
            mapping_id: mapping_id.clone(),
            connection_id: connection_id.clone(),
        });
        self.variables[b.0].equivalences.push(Equivalence {
            variable: a,
            mapping_id,
            connection_id,
        });
        true
    }

    pub fn remove_equivalence(&mut self, a: VariableId, b: VariableId) -> bool {
        let before = self.variables[a.0].equivalences.len();
        self.variables[a.0].equivalences.retain(|e| e.variable != b);
        self.variables[b.0].equivalences.retain(|e| e.variable != a);
        before != self.variables[a.0].equivalences.len()
    }

    pub fn equivalent_variables(&self, id: VariableId) -> impl Iterator<Item = VariableId> + '_ {
        self.variables[id.0].equivalences.iter().map(|e| e.variable)
    }

    /// Each equivalence link once, as named tuples
    pub fn equivalence_tuples(&self) -> Vec<EquivalenceTuple> {
        let mut tuples = Vec::new();
        for (id, variable) in self.variables() {
            for link in &variable.equivalences {
                if link.variable < id {
                    continue;
                }
                let other = &self.variables[link.variable.0];
                tuples.push(EquivalenceTuple {
                    variable_1: (self.components[variable.component.0].name.clone(), variable.name.clone()),
                    variable_2: (self.components[other.component.0].name.clone(), other.name.clone()),
                    mapping_id: link.mapping_id.clone(),
                    connection_id: link.connection_id.clone(),
                });
            }
        }
        tuples
    }

    // Units

    pub fn add_units(&mut self, units: Units) -> UnitsId {
        self.units.push(units);
        UnitsId(self.units.len() - 1)
    }

    pub fn units(&self) -> &[Units] {
        &self.units
    }

    pub fn units_at(&self, id: UnitsId) -> &Units {
        &self.units[id.0]
    }

    pub fn units_at_mut(&mut self, id: UnitsId) -> &mut Units {
        &mut self.units[id.0]
    }

    pub fn units_id(&self, name: &str) -> Option<UnitsId> {
        self.units.iter().position(|u| u.name == name).map(UnitsId)
    }

    pub fn units_by_name(&self, name: &str) -> Option<&Units> {
        self.units.iter().find(|u| u.name == name)
    }

    pub fn has_units(&self, name: &str) -> bool {
        self.units_by_name(name).is_some()
    }

    // Imports

    /// Source for `url`, reusing an existing one
    pub fn import_source_for_url(&mut self, url: &str) -> ImportSourceId {
        if let Some(i) = self.import_sources.iter().position(|s| s.url == url) {
            return ImportSourceId(i);
        }
        self.import_sources.push(ImportSource {
            url: url.to_string(),
            model: None,
        });
        ImportSourceId(self.import_sources.len() - 1)
    }

    pub fn import_source(&self, id: ImportSourceId) -> &ImportSource {
        &self.import_sources[id.0]
    }

    pub fn import_source_mut(&mut self, id: ImportSourceId) -> &mut ImportSource {
        &mut self.import_sources[id.0]
    }

    pub fn import_sources(&self) -> &[ImportSource] {
        &self.import_sources
    }

    /// True while any component or units is still an import placeholder
    pub fn has_unresolved_imports(&self) -> bool {
        self.components.iter().any(Component::is_import) || self.units.iter().any(Units::is_import)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> (Model, ComponentId, ComponentId, ComponentId) {
        let mut model = Model::new("m");
        let parent = model.add_component(Component::new("parent"), None);
        let child1 = model.add_component(Component::new("child1"), Some(parent));
        let child2 = model.add_component(Component::new("child2"), Some(parent));
        (model, parent, child1, child2)
    }

    #[test]
    fn test_encapsulation_relation() {
        let (model, parent, child1, child2) = tree();
        assert_eq!(model.encapsulation_relation(child1, child1), Encapsulation::Same);
        assert_eq!(model.encapsulation_relation(child1, child2), Encapsulation::Siblings);
        assert_eq!(model.encapsulation_relation(parent, child2), Encapsulation::ParentChild);
    }

    #[test]
    fn test_grandchild_is_unrelated() {
        let (mut model, parent, child1, _) = tree();
        let grandchild = model.add_component(Component::new("grandchild"), Some(child1));
        assert_eq!(model.encapsulation_relation(parent, grandchild), Encapsulation::Unrelated);
        assert_eq!(
            model.components_in_order(),
            vec![parent, child1, grandchild, ComponentId(2)]
        );
    }

    #[test]
    fn test_equivalence_is_symmetric() {
        let (mut model, _, child1, child2) = tree();
        let a = model.add_variable(child1, Variable::new("a", "second")).unwrap();
        let b = model.add_variable(child2, Variable::new("b", "second")).unwrap();

        assert!(model.add_equivalence(a, b));
        assert!(!model.add_equivalence(b, a));
        assert!(!model.add_equivalence(a, a));
        assert!(model.variable(b).is_equivalent_to(a));
        assert_eq!(model.equivalence_tuples().len(), 1);

        assert!(model.remove_equivalence(b, a));
        assert!(model.variable(a).equivalences.is_empty());
        assert!(model.variable(b).equivalences.is_empty());
    }

    #[test]
    fn test_placeholder_cannot_own_variables() {
        let mut model = Model::new("m");
        let source = model.import_source_for_url("other.cellml");
        let c = model.add_component(Component::new_import("c", source, "real"), None);

        assert!(model.add_variable(c, Variable::new("x", "second")).is_none());
        assert!(model.has_unresolved_imports());
        assert_eq!(model.import_source_for_url("other.cellml"), source);
    }

    #[test]
    fn test_set_parent_moves_component() {
        let (mut model, parent, child1, _) = tree();
        model.set_parent(child1, None);
        assert_eq!(model.root_components(), &[parent, child1]);
        assert_eq!(model.component(parent).children.len(), 1);
    }
}
