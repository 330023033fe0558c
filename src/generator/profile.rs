//! Output-language syntax tables
//!
//! A [`GeneratorProfile`] holds every fragment of target syntax the emitter
//! writes. Templates use `[NAME]`, `[INDEX]`, `[COUNT]`, `[CODE]`,
//! `[ARGUMENTS]` and `[INTERFACE_FILE_NAME]` placeholders. Adding a language
//! means adding a preset here; tree construction and classification do not
//! change.

use serde::{Deserialize, Serialize};

use crate::config::ProfileKind;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GeneratorProfile {
    pub name: String,
    /// Whether a separate interface blob is produced
    pub has_interface: bool,

    // Headers and declarations
    pub interface_header: String,
    pub implementation_header: String,
    pub interface_state_count: String,
    pub implementation_state_count: String,
    pub interface_variable_count: String,
    pub implementation_variable_count: String,
    pub interface_initialize_constants: String,
    pub interface_compute_rates: String,
    pub interface_compute_variables: String,

    // Routines
    pub initialize_constants_begin: String,
    pub compute_rates_begin: String,
    pub compute_variables_begin: String,
    pub routine_end: String,
    pub routine_separator: String,
    pub indent: String,
    /// Local alias declaration, `[NAME]` aliasing `[CODE]`
    pub alias_declaration: String,

    // Storage
    pub voi: String,
    pub states_array: String,
    pub rates_array: String,
    pub variables_array: String,
    pub algebraic_alias: String,
    pub array_element: String,

    // Statements
    pub assignment: String,
    pub statement_terminator: String,
    pub comment: String,

    // Operators
    pub eq: String,
    pub neq: String,
    pub lt: String,
    pub leq: String,
    pub gt: String,
    pub geq: String,
    pub and: String,
    pub or: String,
    pub not: String,
    pub plus: String,
    pub minus: String,
    pub times: String,
    pub divide: String,

    // Functions
    pub function_call: String,
    pub argument_separator: String,
    pub power: String,
    pub square_root: String,
    pub absolute_value: String,
    pub exponential: String,
    pub natural_logarithm: String,
    pub common_logarithm: String,
    pub floor: String,
    pub ceiling: String,
    pub sin: String,
    pub cos: String,
    pub tan: String,
    pub sinh: String,
    pub cosh: String,
    pub tanh: String,
    pub asin: String,
    pub acos: String,
    pub atan: String,

    // Constants
    pub true_value: String,
    pub false_value: String,
    pub pi: String,
    pub e: String,
    pub infinity: String,
    pub nan: String,
}

impl Default for GeneratorProfile {
    fn default() -> Self {
        Self::c()
    }
}

impl GeneratorProfile {
    /// Preset for a profile kind
    pub fn for_kind(kind: ProfileKind) -> Self {
        match kind {
            ProfileKind::C => Self::c(),
            ProfileKind::Python => Self::python(),
        }
    }

    /// C header plus implementation
    pub fn c() -> Self {
        Self {
            name: "C".to_string(),
            has_interface: true,

            interface_header: "#pragma once\n\n#include <stddef.h>\n".to_string(),
            implementation_header: "#include \"[INTERFACE_FILE_NAME]\"\n\n#include <math.h>\n".to_string(),
            interface_state_count: "extern const size_t STATE_COUNT;\n".to_string(),
            implementation_state_count: "const size_t STATE_COUNT = [COUNT];\n".to_string(),
            interface_variable_count: "extern const size_t VARIABLE_COUNT;\n".to_string(),
            implementation_variable_count: "const size_t VARIABLE_COUNT = [COUNT];\n".to_string(),
            interface_initialize_constants: "void initializeConstants(double *states, double *variables);\n"
                .to_string(),
            interface_compute_rates:
                "void computeRates(double voi, double *states, double *rates, double *variables);\n".to_string(),
            interface_compute_variables:
                "void computeVariables(double voi, double *states, double *rates, double *variables);\n"
                    .to_string(),

            initialize_constants_begin: "void initializeConstants(double *states, double *variables)\n{\n"
                .to_string(),
            compute_rates_begin: "void computeRates(double voi, double *states, double *rates, double *variables)\n{\n"
                .to_string(),
            compute_variables_begin:
                "void computeVariables(double voi, double *states, double *rates, double *variables)\n{\n"
                    .to_string(),
            routine_end: "}\n".to_string(),
            routine_separator: "\n".to_string(),
            indent: "    ".to_string(),
            alias_declaration: "double *[NAME] = [CODE];".to_string(),

            voi: "voi".to_string(),
            states_array: "states".to_string(),
            rates_array: "rates".to_string(),
            variables_array: "variables".to_string(),
            algebraic_alias: "algebraic".to_string(),
            array_element: "[NAME][[INDEX]]".to_string(),

            assignment: " = ".to_string(),
            statement_terminator: ";".to_string(),
            comment: " /* [CODE] */".to_string(),

            eq: " == ".to_string(),
            neq: " != ".to_string(),
            lt: " < ".to_string(),
            leq: " <= ".to_string(),
            gt: " > ".to_string(),
            geq: " >= ".to_string(),
            and: " && ".to_string(),
            or: " || ".to_string(),
            not: "!".to_string(),
            plus: "+".to_string(),
            minus: "-".to_string(),
            times: "*".to_string(),
            divide: "/".to_string(),

            function_call: "[NAME]([ARGUMENTS])".to_string(),
            argument_separator: ", ".to_string(),
            power: "pow".to_string(),
            square_root: "sqrt".to_string(),
            absolute_value: "fabs".to_string(),
            exponential: "exp".to_string(),
            natural_logarithm: "log".to_string(),
            common_logarithm: "log10".to_string(),
            floor: "floor".to_string(),
            ceiling: "ceil".to_string(),
            sin: "sin".to_string(),
            cos: "cos".to_string(),
            tan: "tan".to_string(),
            sinh: "sinh".to_string(),
            cosh: "cosh".to_string(),
            tanh: "tanh".to_string(),
            asin: "asin".to_string(),
            acos: "acos".to_string(),
            atan: "atan".to_string(),

            true_value: "1.0".to_string(),
            false_value: "0.0".to_string(),
            pi: "M_PI".to_string(),
            e: "M_E".to_string(),
            infinity: "INFINITY".to_string(),
            nan: "NAN".to_string(),
        }
    }

    /// Single Python module
    pub fn python() -> Self {
        Self {
            name: "Python".to_string(),
            has_interface: false,

            interface_header: String::new(),
            implementation_header: "from math import *\n".to_string(),
            interface_state_count: String::new(),
            implementation_state_count: "STATE_COUNT = [COUNT]\n".to_string(),
            interface_variable_count: String::new(),
            implementation_variable_count: "VARIABLE_COUNT = [COUNT]\n".to_string(),
            interface_initialize_constants: String::new(),
            interface_compute_rates: String::new(),
            interface_compute_variables: String::new(),

            initialize_constants_begin: "def initialize_constants(states, variables):\n".to_string(),
            compute_rates_begin: "def compute_rates(voi, states, rates, variables):\n".to_string(),
            compute_variables_begin: "def compute_variables(voi, states, rates, variables):\n".to_string(),
            routine_end: String::new(),
            routine_separator: "\n\n".to_string(),
            indent: "    ".to_string(),
            alias_declaration: "[NAME] = [CODE]".to_string(),

            statement_terminator: String::new(),
            comment: "  # [CODE]".to_string(),

            and: " and ".to_string(),
            or: " or ".to_string(),
            not: "not ".to_string(),

            absolute_value: "fabs".to_string(),
            pi: "pi".to_string(),
            e: "e".to_string(),
            infinity: "inf".to_string(),
            nan: "nan".to_string(),
            ..Self::c()
        }
    }

    /// Fill `[NAME]([ARGUMENTS])`
    pub fn call(&self, function: &str, arguments: &[String]) -> String {
        self.function_call
            .replace("[NAME]", function)
            .replace("[ARGUMENTS]", &arguments.join(&self.argument_separator))
    }

    /// Fill `[NAME][[INDEX]]`
    pub fn element(&self, array: &str, index: usize) -> String {
        self.array_element
            .replace("[NAME]", array)
            .replace("[INDEX]", &index.to_string())
    }

    pub fn comment_text(&self, code: &str) -> String {
        self.comment.replace("[CODE]", code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_and_call_templates() {
        let c = GeneratorProfile::c();
        assert_eq!(c.element("states", 2), "states[2]");
        assert_eq!(c.call("pow", &["x".to_string(), "2.0".to_string()]), "pow(x, 2.0)");
        assert_eq!(c.comment_text("V"), " /* V */");
    }

    #[test]
    fn test_python_overrides_c() {
        let py = GeneratorProfile::python();
        assert!(!py.has_interface);
        assert_eq!(py.statement_terminator, "");
        assert_eq!(py.and, " and ");
        assert_eq!(py.plus, "+");
        assert_eq!(py.comment_text("V"), "  # V");
    }

    #[test]
    fn test_profile_loads_from_partial_json() {
        let profile: GeneratorProfile = serde_json::from_str(r#"{"name": "C99", "pi": "3.14159"}"#).unwrap();
        assert_eq!(profile.name, "C99");
        assert_eq!(profile.pi, "3.14159");
        assert_eq!(profile.times, "*");
    }
}
