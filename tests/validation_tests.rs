//! Whole-model validation tests

use cellml_sdk::config::{EngineConfig, LiteralPolicy};
use cellml_sdk::import::ModelParser;
use cellml_sdk::issue::{IssueKind, ItemRef, Level, ReferenceRule};
use cellml_sdk::models::Model;
use cellml_sdk::validation::Validator;

fn parse(body: &str) -> Model {
    let text = format!(
        r#"<model xmlns="http://www.cellml.org/cellml/2.0#" xmlns:cellml="http://www.cellml.org/cellml/2.0#" name="cell">{}</model>"#,
        body
    );
    ModelParser::new().parse_model(&text).unwrap()
}

mod model_tests {
    use super::*;

    #[test]
    fn test_consistent_model_has_no_issues() {
        let model = parse(
            r#"
            <units name="ms"><unit units="second" prefix="milli"/></units>
            <units name="per_ms"><unit units="ms" exponent="-1"/></units>
            <component name="environment">
              <variable name="time" units="ms" interface="public"/>
            </component>
            <component name="gate">
              <variable name="time" units="ms" interface="public"/>
              <variable name="n" units="dimensionless" initial_value="0.3"/>
              <variable name="alpha" units="per_ms" initial_value="0.1"/>
              <math xmlns="http://www.w3.org/1998/Math/MathML">
                <apply><eq/>
                  <apply><diff/><bvar><ci>time</ci></bvar><ci>n</ci></apply>
                  <apply><times/><ci>alpha</ci>
                    <apply><minus/><cn cellml:units="dimensionless">1</cn><ci>n</ci></apply>
                  </apply>
                </apply>
              </math>
            </component>
            <connection component_1="environment" component_2="gate">
              <map_variables variable_1="time" variable_2="time"/>
            </connection>"#,
        );

        let mut validator = Validator::new();
        let valid = validator.validate_model(&model);
        assert!(valid, "{:?}", validator.issues());
        assert!(validator.issues().is_empty());
    }

    #[test]
    fn test_undeclared_variable_in_math() {
        let model = parse(
            r#"
            <component name="c">
              <variable name="a" units="dimensionless"/>
              <variable name="b" units="dimensionless"/>
              <math xmlns="http://www.w3.org/1998/Math/MathML">
                <apply><eq/><ci>x</ci><apply><plus/><ci>a</ci><ci>b</ci></apply></apply>
              </math>
            </component>"#,
        );

        let mut validator = Validator::new();
        assert!(!validator.validate_model(&model));

        let issues: Vec<_> = validator.issues().of_kind(IssueKind::MissingReference).collect();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].reference_rule, ReferenceRule::MathCiVariable);
        assert!(issues[0].description.contains("'x'"));
        assert_eq!(issues[0].item, Some(ItemRef::Math { component: "c".to_string() }));
    }

    #[test]
    fn test_connection_units_mismatch_levels() {
        let model = parse(
            r#"
            <units name="mV"><unit units="volt" prefix="milli"/></units>
            <component name="a">
              <variable name="v" units="mV"/>
              <variable name="t" units="second"/>
            </component>
            <component name="b">
              <variable name="v" units="volt"/>
              <variable name="t" units="metre"/>
            </component>
            <connection component_1="a" component_2="b">
              <map_variables variable_1="v" variable_2="v"/>
              <map_variables variable_1="t" variable_2="t"/>
            </connection>"#,
        );

        let mut validator = Validator::new();
        validator.validate_model(&model);
        let mismatches: Vec<_> = validator.issues().of_kind(IssueKind::UnitsMismatch).collect();
        assert_eq!(mismatches.len(), 2);

        let scale = mismatches.iter().find(|i| i.description.contains("'mV'")).unwrap();
        assert_eq!(scale.level, Level::Warning);
        assert!(scale.description.ends_with("multiplication factor of 10^-3"));

        let dimension = mismatches.iter().find(|i| i.description.contains("'metre'")).unwrap();
        assert_eq!(dimension.level, Level::Error);
        assert!(dimension.description.contains("metre^-1, second^1"));
    }

    #[test]
    fn test_equivalence_cycle_reported_once() {
        let model = parse(
            r#"
            <component name="c1"><variable name="x" units="second"/></component>
            <component name="c2"><variable name="x" units="second"/></component>
            <component name="c3"><variable name="x" units="second"/></component>
            <connection component_1="c1" component_2="c2"><map_variables variable_1="x" variable_2="x"/></connection>
            <connection component_1="c2" component_2="c3"><map_variables variable_1="x" variable_2="x"/></connection>
            <connection component_1="c3" component_2="c1"><map_variables variable_1="x" variable_2="x"/></connection>"#,
        );

        let mut validator = Validator::new();
        validator.validate_model(&model);
        let cycles: Vec<_> = validator.issues().of_kind(IssueKind::CyclicDependency).collect();
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].reference_rule, ReferenceRule::MapVariablesCycle);
        assert!(cycles[0].description.contains("('c1', 'x') -> "));
    }
}

mod literal_policy_tests {
    use super::*;

    const BAD_EXPONENT: &str = r#"<model xmlns="http://www.cellml.org/cellml/2.0#" name="m">
        <units name="u"><unit units="second" exponent="two"/></units>
    </model>"#;

    #[test]
    fn test_lenient_literal_is_a_warning() {
        let result = ModelParser::new().parse(BAD_EXPONENT).unwrap();
        let issue = result.issues.of_kind(IssueKind::MalformedNumericLiteral).next().unwrap();
        assert_eq!(issue.level, Level::Warning);
        assert_eq!(result.model.units()[0].units()[0].exponent, 1.0);
    }

    #[test]
    fn test_strict_literal_is_an_error() {
        let config = EngineConfig::builder().numeric_literals(LiteralPolicy::Strict).build();
        let result = ModelParser::with_config(config).parse(BAD_EXPONENT).unwrap();
        let issue = result.issues.of_kind(IssueKind::MalformedNumericLiteral).next().unwrap();
        assert_eq!(issue.level, Level::Error);
        assert_eq!(issue.reference_rule, ReferenceRule::UnitExponent);
    }

    #[test]
    fn test_policy_loads_from_toml() {
        let config = EngineConfig::from_toml_str("numericLiterals = \"strict\"\nprofile = \"python\"").unwrap();
        assert_eq!(config.numeric_literals, LiteralPolicy::Strict);
        assert_eq!(config.interface_file_name, "model.h");
    }
}
