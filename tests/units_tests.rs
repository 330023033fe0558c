//! Units equivalence and cycle detection tests

use cellml_sdk::models::{Component, Model, Unit, Units, Variable};
use cellml_sdk::validation::{
    find_equivalence_cycles, find_units_cycles, units_are_equivalent, units_names_equivalent,
};

fn physiology_units() -> Model {
    let mut model = Model::new("units");
    model.add_units(Units::new("day").with_unit(Unit::new("second").with_multiplier(86400.0)));
    model.add_units(Units::new("per_day").with_unit(Unit::new("day").with_exponent(-1.0)));
    model.add_units(
        Units::new("per_second_scaled").with_unit(
            Unit::new("second")
                .with_exponent(-1.0)
                .with_multiplier(1.0 / 86400.0),
        ),
    );
    model.add_units(Units::new("millivolt").with_unit(Unit::new("volt").with_prefix("milli")));
    model.add_units(
        Units::new("per_m2").with_unit(Unit::new("metre").with_exponent(-2.0)),
    );
    model.add_units(Units::new("unitless").with_unit(Unit::new("dimensionless")));
    model
}

mod equivalence_tests {
    use super::*;

    #[test]
    fn test_derived_chain_matches_direct_definition() {
        let mut model = physiology_units();
        let c = model.add_component(Component::new("c"), None);
        let rate = model.add_variable(c, Variable::new("rate", "per_day")).unwrap();
        let scaled = model.add_variable(c, Variable::new("scaled", "per_second_scaled")).unwrap();

        let comparison = units_are_equivalent(&model, rate, scaled);
        assert!(comparison.equivalent, "{}", comparison.hint);
        assert_eq!(comparison.hint, "");
    }

    #[test]
    fn test_prefix_only_mismatch_reports_factor() {
        let mut model = physiology_units();
        let c = model.add_component(Component::new("c"), None);
        let mv = model.add_variable(c, Variable::new("v1", "millivolt")).unwrap();
        let v = model.add_variable(c, Variable::new("v2", "volt")).unwrap();

        let comparison = units_are_equivalent(&model, mv, v);
        assert!(!comparison.equivalent);
        assert!(comparison.dimensionally_equivalent);
        assert_eq!(comparison.hint, "multiplication factor of 10^-3");

        let reversed = units_are_equivalent(&model, v, mv);
        assert_eq!(reversed.hint, "multiplication factor of 10^3");
    }

    #[test]
    fn test_equivalence_is_reflexive_and_symmetric() {
        let model = physiology_units();
        let names = [
            "day",
            "per_day",
            "per_second_scaled",
            "millivolt",
            "per_m2",
            "unitless",
            "volt",
            "newton",
            "second",
        ];

        for a in names {
            assert!(units_names_equivalent(&model, a, a).equivalent, "{} is not equivalent to itself", a);
            for b in names {
                assert_eq!(
                    units_names_equivalent(&model, a, b).equivalent,
                    units_names_equivalent(&model, b, a).equivalent,
                    "{} vs {}",
                    a,
                    b
                );
            }
        }
    }

    #[test]
    fn test_dimensionless_never_mismatches() {
        let model = physiology_units();
        let comparison = units_names_equivalent(&model, "unitless", "radian");
        assert!(comparison.equivalent);
        assert!(units_names_equivalent(&model, "steradian", "dimensionless").equivalent);
    }

    #[test]
    fn test_dimension_mismatch_lists_exponents() {
        let model = physiology_units();
        let comparison = units_names_equivalent(&model, "per_m2", "second");
        assert!(!comparison.equivalent);
        assert!(!comparison.dimensionally_equivalent);
        assert_eq!(comparison.hint, "metre^-2, second^-1");
    }

    #[test]
    fn test_farad_is_coulomb_per_volt() {
        let mut model = physiology_units();
        model.add_units(
            Units::new("coulomb_per_volt")
                .with_unit(Unit::new("coulomb"))
                .with_unit(Unit::new("volt").with_exponent(-1.0)),
        );
        let comparison = units_names_equivalent(&model, "coulomb_per_volt", "farad");
        assert!(comparison.equivalent, "{}", comparison.hint);
    }

    #[test]
    fn test_undefined_units_are_named() {
        let model = physiology_units();
        let comparison = units_names_equivalent(&model, "fortnight", "second");
        assert!(!comparison.equivalent);
        assert_eq!(comparison.hint, "units 'fortnight' are not defined");
    }
}

mod units_cycle_tests {
    use super::*;

    fn model_with(references: &[(&str, &[&str])]) -> Model {
        let mut model = Model::new("cycles");
        for (name, children) in references {
            let mut units = Units::new(*name);
            for child in *children {
                units.add_unit(Unit::new(*child));
            }
            model.add_units(units);
        }
        model
    }

    #[test]
    fn test_two_units_loop_is_reported_from_each_member() {
        let model = model_with(&[("a", &["b"]), ("b", &["a"])]);
        let cycles = find_units_cycles(&model);
        let descriptions: Vec<String> = cycles.iter().map(|c| c.description()).collect();
        assert_eq!(descriptions, ["'a' -> 'b' -> 'a'", "'b' -> 'a' -> 'b'"]);
    }

    #[test]
    fn test_open_chain_has_no_cycle() {
        let model = model_with(&[("a", &["b"]), ("b", &["c"]), ("c", &["second"])]);
        assert!(find_units_cycles(&model).is_empty());
    }

    #[test]
    fn test_dense_acyclic_definitions_have_no_cycle() {
        let mut model = Model::new("layers");
        for i in 0..40 {
            let mut units = Units::new(format!("u{}", i));
            for j in (i + 1)..40 {
                units.add_unit(Unit::new(format!("u{}", j)));
            }
            model.add_units(units);
        }
        assert!(find_units_cycles(&model).is_empty());
    }

    #[test]
    fn test_lasso_is_not_a_cycle_of_its_tail() {
        let model = model_with(&[("a", &["b"]), ("b", &["c"]), ("c", &["b"])]);
        let cycles = find_units_cycles(&model);
        assert!(cycles.iter().all(|c| c.path[0] != "a"));
        assert_eq!(cycles.len(), 2);
    }
}

mod equivalence_cycle_tests {
    use super::*;

    fn siblings(count: usize) -> (Model, Vec<cellml_sdk::models::VariableId>) {
        let mut model = Model::new("links");
        let mut variables = Vec::new();
        for i in 1..=count {
            let c = model.add_component(Component::new(format!("c{}", i)), None);
            variables.push(model.add_variable(c, Variable::new("x", "second")).unwrap());
        }
        (model, variables)
    }

    #[test]
    fn test_triangle_reported_once_from_smallest_member() {
        let (mut model, v) = siblings(3);
        model.add_equivalence(v[0], v[1]);
        model.add_equivalence(v[1], v[2]);
        model.add_equivalence(v[2], v[0]);

        let cycles = find_equivalence_cycles(&model);
        assert_eq!(cycles.len(), 1);
        let description = cycles[0].description(&model);
        assert!(description.starts_with("('c1', 'x')"));
        assert!(description.ends_with("('c1', 'x')"));
    }

    #[test]
    fn test_square_with_diagonal_has_three_cycles() {
        let (mut model, v) = siblings(4);
        model.add_equivalence(v[0], v[1]);
        model.add_equivalence(v[1], v[2]);
        model.add_equivalence(v[2], v[3]);
        model.add_equivalence(v[3], v[0]);
        model.add_equivalence(v[0], v[2]);

        let cycles = find_equivalence_cycles(&model);
        assert_eq!(cycles.len(), 3);
        assert!(cycles.iter().all(|c| c.variables[0] == v[0]));
    }

    #[test]
    fn test_tree_of_links_has_no_cycle() {
        let (mut model, v) = siblings(4);
        model.add_equivalence(v[0], v[1]);
        model.add_equivalence(v[0], v[2]);
        model.add_equivalence(v[2], v[3]);
        assert!(find_equivalence_cycles(&model).is_empty());
    }
}
