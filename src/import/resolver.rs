//! Import resolution
//!
//! Replaces every component and units import placeholder of a model with a
//! concrete copy of the definition it references. Imported documents are
//! fetched through a [`StorageBackend`] and parsed at most once per
//! resolution call. Transitive imports inside a fetched document are
//! resolved before the definition is lifted into the importing model.
//!
//! A history of `(item, document)` pairs is kept across the recursion. When
//! a pair repeats the chain is reported as a cyclic dependency and only
//! that branch is abandoned; sibling imports still resolve.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::rc::Rc;

use tracing::{debug, info, warn};

use super::parser::ModelParser;
use crate::config::EngineConfig;
use crate::issue::{Issue, IssueKind, ItemRef, Issues, ReferenceRule};
use crate::models::{
    Component, ComponentBody, ComponentDefinition, ComponentId, ImportReference, Model, Unit, Units,
    UnitsDefinition, UnitsId, VariableId,
};
use crate::storage::{StorageBackend, join_url};
use crate::xml::XmlDocument;

/// What a history entry imports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportKind {
    Component,
    Units,
}

/// One step of the import chain being resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub kind: ImportKind,
    pub name: String,
    pub url: String,
}

impl fmt::Display for HistoryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            ImportKind::Component => "component",
            ImportKind::Units => "units",
        };
        write!(f, "{} '{}' from '{}'", kind, self.name, self.url)
    }
}

/// Recursive import resolver
pub struct ImportResolver<B: StorageBackend> {
    backend: B,
    config: EngineConfig,
    library: HashMap<String, Rc<Model>>,
    history: Vec<HistoryEntry>,
    issues: Issues,
    documents_fetched: usize,
}

impl<B: StorageBackend> ImportResolver<B> {
    /// Create a resolver reading documents from `backend`
    pub fn new(backend: B) -> Self {
        Self::with_config(backend, EngineConfig::default())
    }

    pub fn with_config(backend: B, config: EngineConfig) -> Self {
        Self {
            backend,
            config,
            library: HashMap::new(),
            history: Vec::new(),
            issues: Issues::new(),
            documents_fetched: 0,
        }
    }

    /// Resolve every import placeholder reachable from `model`
    ///
    /// # Arguments
    ///
    /// * `model` - Model whose placeholders are replaced in place
    /// * `base_location` - Location of the model's own document; relative
    ///   import URLs are joined to its directory
    ///
    /// # Returns
    ///
    /// `true` when no error was reported. Issues are available from
    /// [`ImportResolver::issues`] until the next call.
    pub fn resolve_imports(&mut self, model: &mut Model, base_location: &str) -> bool {
        self.library.clear();
        self.history.clear();
        self.issues.clear();
        self.documents_fetched = 0;

        let placeholders = model.components().filter(|(_, c)| c.is_import()).count()
            + model.units().iter().filter(|u| u.is_import()).count();
        info!(
            "Resolving {} import placeholders of model '{}' from '{}'",
            placeholders, model.name, base_location
        );

        let components: Vec<ComponentId> = model
            .components_in_order()
            .into_iter()
            .filter(|id| model.component(*id).is_import())
            .collect();
        for id in components {
            self.resolve_component(model, id, base_location);
        }

        let units: Vec<UnitsId> = (0..model.units().len())
            .map(UnitsId)
            .filter(|id| model.units_at(*id).is_import())
            .collect();
        for id in units {
            self.resolve_units(model, id, base_location);
        }

        info!(
            "Import resolution finished: {} documents fetched, {} issues, unresolved imports remaining: {}",
            self.documents_fetched,
            self.issues.len(),
            model.has_unresolved_imports()
        );
        !self.issues.has_errors()
    }

    pub fn issues(&self) -> &Issues {
        &self.issues
    }

    pub fn take_issues(&mut self) -> Issues {
        std::mem::take(&mut self.issues)
    }

    /// Number of documents read from the backend by the last call
    pub fn documents_fetched(&self) -> usize {
        self.documents_fetched
    }

    fn resolve_component(&mut self, model: &mut Model, id: ComponentId, base: &str) -> bool {
        let Some(import) = model.component(id).import_reference().cloned() else {
            return true;
        };
        let url = join_url(base, &model.import_source(import.source).url);
        let item = ItemRef::Component {
            name: model.component(id).name.clone(),
        };
        if !self.enter(ImportKind::Component, &import.reference, &url, &item) {
            return false;
        }
        let resolved = self.import_component(model, id, &import, &url, item);
        self.leave();
        resolved
    }

    fn import_component(
        &mut self,
        model: &mut Model,
        id: ComponentId,
        import: &ImportReference,
        url: &str,
        item: ItemRef,
    ) -> bool {
        let Some(source) = self.fetch(url, &item) else {
            return false;
        };
        model.import_source_mut(import.source).model = Some(Rc::clone(&source));

        let mut foreign = (*source).clone();
        let Some(target) = foreign.find_component(&import.reference) else {
            self.report_missing(ImportKind::Component, &import.reference, url, item);
            return false;
        };

        if !self.resolve_component_tree(&mut foreign, target, url) {
            return false;
        }
        let needed = units_needed_by(&foreign, target);
        if !self.resolve_units_closure(&mut foreign, needed, url) {
            return false;
        }

        lift_component(model, id, &foreign, target);
        true
    }

    fn resolve_units(&mut self, model: &mut Model, id: UnitsId, base: &str) -> bool {
        let Some(import) = model.units_at(id).import_reference().cloned() else {
            return true;
        };
        let url = join_url(base, &model.import_source(import.source).url);
        let item = ItemRef::Units {
            name: model.units_at(id).name.clone(),
        };
        if !self.enter(ImportKind::Units, &import.reference, &url, &item) {
            return false;
        }
        let resolved = self.import_units(model, id, &import, &url, item);
        self.leave();
        resolved
    }

    fn import_units(
        &mut self,
        model: &mut Model,
        id: UnitsId,
        import: &ImportReference,
        url: &str,
        item: ItemRef,
    ) -> bool {
        let Some(source) = self.fetch(url, &item) else {
            return false;
        };
        model.import_source_mut(import.source).model = Some(Rc::clone(&source));

        let mut foreign = (*source).clone();
        let Some(target) = foreign.units_id(&import.reference) else {
            self.report_missing(ImportKind::Units, &import.reference, url, item);
            return false;
        };
        if !self.resolve_units_closure(&mut foreign, vec![import.reference.clone()], url) {
            return false;
        }

        lift_units(model, id, &foreign, target);
        true
    }

    /// Resolve the placeholders in the subtree rooted at `root`
    fn resolve_component_tree(&mut self, model: &mut Model, root: ComponentId, base: &str) -> bool {
        let mut pending = vec![root];
        while let Some(id) = pending.pop() {
            if model.component(id).is_import() && !self.resolve_component(model, id, base) {
                return false;
            }
            pending.extend(model.component(id).children.iter().rev().copied());
        }
        true
    }

    /// Resolve the placeholders among the named units and everything they
    /// reference
    fn resolve_units_closure(&mut self, model: &mut Model, mut needed: Vec<String>, base: &str) -> bool {
        let mut seen = HashSet::new();
        while let Some(name) = needed.pop() {
            if !seen.insert(name.clone()) {
                continue;
            }
            let Some(id) = model.units_id(&name) else {
                continue;
            };
            if model.units_at(id).is_import() && !self.resolve_units(model, id, base) {
                return false;
            }
            needed.extend(model.units_at(id).units().iter().map(|u| u.reference.clone()));
        }
        true
    }

    fn enter(&mut self, kind: ImportKind, name: &str, url: &str, item: &ItemRef) -> bool {
        let entry = HistoryEntry {
            kind,
            name: name.to_string(),
            url: url.to_string(),
        };
        if self.history.contains(&entry) {
            let chain = self
                .history
                .iter()
                .chain(std::iter::once(&entry))
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join(" -> ");
            warn!("Cyclic import detected: {}", chain);
            self.issues.push(
                Issue::error(
                    IssueKind::CyclicDependency,
                    ReferenceRule::ImportCycle,
                    format!("Cyclic dependencies were found when attempting to resolve imports: {}", chain),
                )
                .with_item(item.clone()),
            );
            return false;
        }
        debug!("Import history push: {}", entry);
        self.history.push(entry);
        true
    }

    fn leave(&mut self) {
        if let Some(entry) = self.history.pop() {
            debug!("Import history pop: {}", entry);
        }
    }

    fn chain(&self) -> String {
        self.history
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join(" -> ")
    }

    fn fetch(&mut self, url: &str, item: &ItemRef) -> Option<Rc<Model>> {
        if let Some(model) = self.library.get(url) {
            return Some(Rc::clone(model));
        }

        debug!("Fetching import document '{}'", url);
        self.documents_fetched += 1;
        let text = match self.backend.read_to_string(url) {
            Ok(text) => text,
            Err(e) => {
                warn!("Import document '{}' could not be opened: {}", url, e);
                self.issues.push(
                    Issue::error(
                        IssueKind::ImportUnavailable,
                        ReferenceRule::ImporterMissingFile,
                        format!(
                            "Import of '{}' failed: the document could not be opened ({}). Import chain: {}",
                            url,
                            e,
                            self.chain()
                        ),
                    )
                    .with_item(item.clone()),
                );
                return None;
            }
        };

        let model = match ModelParser::with_config(self.config.clone()).parse_model(&text) {
            Ok(model) => model,
            Err(e) => {
                warn!("Import document '{}' is not a valid model: {}", url, e);
                self.issues.push(
                    Issue::error(
                        IssueKind::ImportUnavailable,
                        ReferenceRule::ImporterNullModel,
                        format!(
                            "Import of '{}' failed: the document is not a valid model ({}). Import chain: {}",
                            url,
                            e,
                            self.chain()
                        ),
                    )
                    .with_item(item.clone()),
                );
                return None;
            }
        };

        let model = Rc::new(model);
        self.library.insert(url.to_string(), Rc::clone(&model));
        Some(model)
    }

    fn report_missing(&mut self, kind: ImportKind, name: &str, url: &str, item: ItemRef) {
        let (rule, what) = match kind {
            ImportKind::Component => (ReferenceRule::ImporterMissingComponent, "component"),
            ImportKind::Units => (ReferenceRule::ImporterMissingUnits, "units"),
        };
        warn!("Document '{}' has no {} named '{}'", url, what, name);
        self.issues.push(
            Issue::error(
                IssueKind::ImportUnavailable,
                rule,
                format!(
                    "Import of {} '{}' from '{}' requires {} named '{}' which cannot be found. Import chain: {}",
                    what,
                    name,
                    url,
                    what,
                    name,
                    self.chain()
                ),
            )
            .with_item(item),
        );
    }
}

/// Units referenced by the variables and math of a component subtree
fn units_needed_by(model: &Model, root: ComponentId) -> Vec<String> {
    let mut needed = Vec::new();
    for id in model.subtree(root) {
        let component = model.component(id);
        needed.extend(component.variables().iter().map(|v| model.variable(*v).units.clone()));
        needed.extend(math_units(component.math()));
    }
    needed
}

/// Values of `units` attributes on `cn` elements
fn math_units(math: &str) -> Vec<String> {
    if math.trim().is_empty() {
        return Vec::new();
    }
    let Ok(doc) = XmlDocument::parse(math) else {
        return Vec::new();
    };
    doc.top_level()
        .flat_map(|top| std::iter::once(top).chain(top.descendants()))
        .filter(|node| node.is_element("cn"))
        .filter_map(|node| node.attribute("units").map(str::to_string))
        .collect()
}

/// Copy a units definition (and what it depends on) from `foreign` into
/// `model`, returning the name it has in `model`. A definition whose name
/// is taken by a different definition is renamed `name_1`, `name_2`, ...
fn materialise_units(
    model: &mut Model,
    foreign: &Model,
    name: &str,
    renames: &mut HashMap<String, String>,
) -> String {
    if let Some(renamed) = renames.get(name) {
        return renamed.clone();
    }
    let Some(definition) = foreign.units_by_name(name).map(|u| u.definition.clone()) else {
        return name.to_string();
    };

    if let Some(existing) = model.units_by_name(name)
        && existing.definition == definition
    {
        renames.insert(name.to_string(), name.to_string());
        return name.to_string();
    }

    let target = if model.has_units(name) {
        fresh_units_name(model, name)
    } else {
        name.to_string()
    };
    renames.insert(name.to_string(), target.clone());
    let id = model.add_units(Units::new(target.clone()));

    let units = copy_unit_references(model, foreign, &definition, renames);
    model.units_at_mut(id).definition = UnitsDefinition::Concrete { units };
    target
}

fn copy_unit_references(
    model: &mut Model,
    foreign: &Model,
    definition: &UnitsDefinition,
    renames: &mut HashMap<String, String>,
) -> Vec<Unit> {
    let source = match definition {
        UnitsDefinition::Concrete { units } => units.as_slice(),
        UnitsDefinition::Import(_) => &[],
    };
    let mut copied = Vec::with_capacity(source.len());
    for unit in source {
        let mut unit = unit.clone();
        unit.reference = materialise_units(model, foreign, &unit.reference, renames);
        copied.push(unit);
    }
    copied
}

fn fresh_units_name(model: &Model, name: &str) -> String {
    (1..)
        .map(|i| format!("{}_{}", name, i))
        .find(|candidate| !model.has_units(candidate))
        .unwrap_or_else(|| name.to_string())
}

fn lift_units(model: &mut Model, id: UnitsId, foreign: &Model, target: UnitsId) {
    let definition = foreign.units_at(target).definition.clone();
    let mut renames = HashMap::new();
    renames.insert(foreign.units_at(target).name.clone(), model.units_at(id).name.clone());

    let units = copy_unit_references(model, foreign, &definition, &mut renames);
    model.units_at_mut(id).definition = UnitsDefinition::Concrete { units };
}

fn lift_component(model: &mut Model, id: ComponentId, foreign: &Model, target: ComponentId) {
    let mut renames = HashMap::new();
    let mut variables = BTreeMap::new();

    copy_body(model, id, foreign, target, &mut renames, &mut variables);

    let mut stack: Vec<(ComponentId, ComponentId)> = foreign
        .component(target)
        .children
        .iter()
        .rev()
        .map(|child| (*child, id))
        .collect();
    while let Some((source, parent)) = stack.pop() {
        let copy = model.add_component(Component::new(foreign.component(source).name.clone()), Some(parent));
        copy_body(model, copy, foreign, source, &mut renames, &mut variables);
        stack.extend(foreign.component(source).children.iter().rev().map(|child| (*child, copy)));
    }

    for (old, new) in &variables {
        for link in &foreign.variable(*old).equivalences {
            if let Some(other) = variables.get(&link.variable) {
                model.add_equivalence_with_ids(*new, *other, link.mapping_id.clone(), link.connection_id.clone());
            }
        }
    }
}

fn copy_body(
    model: &mut Model,
    id: ComponentId,
    foreign: &Model,
    source: ComponentId,
    renames: &mut HashMap<String, String>,
    variables: &mut BTreeMap<VariableId, VariableId>,
) {
    let Some(body) = foreign.component(source).body() else {
        return;
    };
    model.component_mut(id).definition = ComponentDefinition::Concrete(ComponentBody {
        variables: Vec::new(),
        resets: Vec::new(),
        math: String::new(),
    });

    for old in &body.variables {
        let mut variable = foreign.variable(*old).clone();
        variable.units = materialise_units(model, foreign, &variable.units, renames);
        if let Some(new) = model.add_variable(id, variable) {
            variables.insert(*old, new);
        }
    }

    let reset_math = body
        .resets
        .iter()
        .flat_map(|reset| &reset.whens)
        .flat_map(|when| [when.condition.as_str(), when.value.as_str()]);
    for fragment in std::iter::once(body.math.as_str()).chain(reset_math) {
        for name in math_units(fragment) {
            materialise_units(model, foreign, &name, renames);
        }
    }

    let mut resets = body.resets.clone();
    for when in resets.iter_mut().flat_map(|reset| reset.whens.iter_mut()) {
        when.condition = rename_math_units(&when.condition, renames);
        when.value = rename_math_units(&when.value, renames);
    }
    if let Some(copy) = model.component_mut(id).body_mut() {
        copy.math = rename_math_units(&body.math, renames);
        copy.resets = resets;
    }
}

/// Point `units` attributes of `cn` elements at the names their
/// definitions were given in the importing model
fn rename_math_units(math: &str, renames: &HashMap<String, String>) -> String {
    let Ok(doc) = XmlDocument::parse(math) else {
        return math.to_string();
    };

    let mut edits = Vec::new();
    for node in doc.top_level().flat_map(|top| std::iter::once(top).chain(top.descendants())) {
        if !node.is_element("cn") {
            continue;
        }
        let Some(old) = node.attribute("units") else {
            continue;
        };
        let Some(new) = renames.get(old).filter(|new| new.as_str() != old) else {
            continue;
        };
        let (start, end) = node.span();
        let Some(tag) = math.get(start..end).and_then(|element| element.split('>').next()) else {
            continue;
        };
        for quote in ['"', '\''] {
            let attribute = format!("units={quote}{old}{quote}");
            if let Some(offset) = tag.find(&attribute) {
                edits.push((start + offset, attribute.len(), format!("units={quote}{new}{quote}")));
                break;
            }
        }
    }

    let mut renamed = math.to_string();
    for (at, len, replacement) in edits.into_iter().rev() {
        renamed.replace_range(at..at + len, &replacement);
    }
    renamed
}
