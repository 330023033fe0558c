//! Import module tests

use std::fs;
use std::path::Path;

use cellml_sdk::import::{ImportResolver, ModelParser};
use cellml_sdk::issue::{IssueKind, ReferenceRule};
use cellml_sdk::models::Model;
use cellml_sdk::storage::FileSystemStorageBackend;
use tempfile::TempDir;

fn document(body: &str) -> String {
    format!(
        r#"<model xmlns="http://www.cellml.org/cellml/2.0#" xmlns:xlink="http://www.w3.org/1999/xlink" name="m">{}</model>"#,
        body
    )
}

fn write(dir: &Path, name: &str, body: &str) {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, document(body)).unwrap();
}

fn load(dir: &Path, name: &str) -> Model {
    let text = fs::read_to_string(dir.join(name)).unwrap();
    ModelParser::new().parse_model(&text).unwrap()
}

mod parser_tests {
    use super::*;

    #[test]
    fn test_parse_encapsulation_and_connections() {
        let text = document(
            r#"
            <component name="outer"><variable name="x" units="second" interface="public_and_private"/></component>
            <component name="inner"><variable name="x" units="second" interface="public"/></component>
            <encapsulation>
              <component_ref component="outer"><component_ref component="inner"/></component_ref>
            </encapsulation>
            <connection component_1="outer" component_2="inner" id="c1">
              <map_variables variable_1="x" variable_2="x" id="m1"/>
            </connection>"#,
        );
        let result = ModelParser::new().parse(&text).unwrap();

        assert!(result.issues.is_empty());
        let model = result.model;
        let outer = model.find_component("outer").unwrap();
        let inner = model.find_component("inner").unwrap();
        assert_eq!(model.component(inner).parent, Some(outer));
        assert_eq!(model.root_components(), [outer]);

        let tuples = model.equivalence_tuples();
        assert_eq!(tuples.len(), 1);
        assert_eq!(tuples[0].mapping_id.as_deref(), Some("m1"));
        assert_eq!(tuples[0].connection_id.as_deref(), Some("c1"));
    }

    #[test]
    fn test_not_a_model_is_an_error() {
        assert!(ModelParser::new().parse("<component name=\"c\"/>").is_err());
        assert!(ModelParser::new().parse("<model").is_err());
    }
}

mod resolver_tests {
    use super::*;

    #[test]
    fn test_resolves_component_and_units_across_files() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "lib/units.cellml",
            r#"<units name="ms"><unit units="second" prefix="milli"/></units>"#,
        );
        write(
            dir.path(),
            "lib/cell.cellml",
            r#"<import xlink:href="units.cellml"><units name="ms" units_ref="ms"/></import>
               <component name="cell"><variable name="V" units="ms"/></component>"#,
        );
        write(
            dir.path(),
            "main.cellml",
            r#"<import xlink:href="lib/cell.cellml"><component name="membrane" component_ref="cell"/></import>"#,
        );

        let mut model = load(dir.path(), "main.cellml");
        assert!(model.has_unresolved_imports());

        let mut resolver = ImportResolver::new(FileSystemStorageBackend::new(dir.path()));
        assert!(resolver.resolve_imports(&mut model, "main.cellml"));
        assert!(!model.has_unresolved_imports());

        let membrane = model.find_component("membrane").unwrap();
        let v = model.component_variable(membrane, "V").unwrap();
        assert_eq!(model.variable(v).units, "ms");
        assert!(model.has_units("ms"));
        assert_eq!(resolver.documents_fetched(), 2);
    }

    #[test]
    fn test_self_import_is_a_cycle() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "main.cellml",
            r#"<import xlink:href="main.cellml"><component name="A" component_ref="A"/></import>"#,
        );

        let mut model = load(dir.path(), "main.cellml");
        let mut resolver = ImportResolver::new(FileSystemStorageBackend::new(dir.path()));

        assert!(!resolver.resolve_imports(&mut model, "main.cellml"));
        let cycles: Vec<_> = resolver.issues().of_kind(IssueKind::CyclicDependency).collect();
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].reference_rule, ReferenceRule::ImportCycle);
        assert!(cycles[0].description.contains("component 'A' from 'main.cellml'"));
    }

    #[test]
    fn test_mutual_import_is_a_cycle() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "f1.cellml",
            r#"<import xlink:href="f2.cellml"><component name="A" component_ref="B"/></import>"#,
        );
        write(
            dir.path(),
            "f2.cellml",
            r#"<import xlink:href="f1.cellml"><component name="B" component_ref="A"/></import>"#,
        );

        let mut model = load(dir.path(), "f1.cellml");
        let mut resolver = ImportResolver::new(FileSystemStorageBackend::new(dir.path()));

        assert!(!resolver.resolve_imports(&mut model, "f1.cellml"));
        let cycle = resolver.issues().of_kind(IssueKind::CyclicDependency).next().unwrap();
        assert!(cycle.description.contains("component 'B' from 'f2.cellml'"));
        assert!(cycle.description.contains("component 'A' from 'f1.cellml'"));
        assert!(model.has_unresolved_imports());
    }

    #[test]
    fn test_sibling_import_resolves_despite_cycle() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "lib.cellml",
            r#"<component name="good"><variable name="x" units="dimensionless"/></component>"#,
        );
        write(
            dir.path(),
            "main.cellml",
            r#"<import xlink:href="main.cellml"><component name="A" component_ref="A"/></import>
               <import xlink:href="lib.cellml"><component name="B" component_ref="good"/></import>"#,
        );

        let mut model = load(dir.path(), "main.cellml");
        let mut resolver = ImportResolver::new(FileSystemStorageBackend::new(dir.path()));
        resolver.resolve_imports(&mut model, "main.cellml");

        let a = model.find_component("A").unwrap();
        let b = model.find_component("B").unwrap();
        assert!(model.component(a).is_import());
        assert!(!model.component(b).is_import());
        assert!(model.component_variable(b, "x").is_some());
    }

    #[test]
    fn test_missing_file_reports_chain() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "main.cellml",
            r#"<import xlink:href="nowhere.cellml"><units name="u" units_ref="u"/></import>"#,
        );

        let mut model = load(dir.path(), "main.cellml");
        let mut resolver = ImportResolver::new(FileSystemStorageBackend::new(dir.path()));

        assert!(!resolver.resolve_imports(&mut model, "main.cellml"));
        let issue = resolver.issues().of_kind(IssueKind::ImportUnavailable).next().unwrap();
        assert_eq!(issue.reference_rule, ReferenceRule::ImporterMissingFile);
        assert!(issue.description.contains("units 'u' from 'nowhere.cellml'"));
    }

    #[test]
    fn test_confined_backend_refuses_parent_directory() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "lib.cellml", r#"<units name="u"/>"#);
        write(
            dir.path(),
            "nested/main.cellml",
            r#"<import xlink:href="../lib.cellml"><units name="u" units_ref="u"/></import>"#,
        );

        let mut model = load(&dir.path().join("nested"), "main.cellml");

        let mut open = ImportResolver::new(FileSystemStorageBackend::new(dir.path().join("nested")));
        assert!(open.resolve_imports(&mut model.clone(), "main.cellml"));

        let mut confined = ImportResolver::new(FileSystemStorageBackend::confined(dir.path().join("nested")));
        assert!(!confined.resolve_imports(&mut model, "main.cellml"));
    }
}
