//! Unit dimensional equivalence
//!
//! Reduces a named units definition to exponents over the base units plus a
//! single base-10 multiplier offset, then compares two reductions by
//! expanding one with a positive sign and the other with a negative sign.
//! The units are equivalent when everything cancels.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::standard_units::{BASE_UNITS, prefix_exponent, standard_unit};
use crate::models::{Model, VariableId};

/// Residue below this magnitude counts as cancelled
const ZERO_TOLERANCE: f64 = 1e-12;

const DIMENSIONLESS: &str = "dimensionless";

/// Outcome of comparing two units
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitsComparison {
    /// Dimensions and multiplier both cancel
    pub equivalent: bool,
    /// Dimensions cancel; the multiplier may still differ
    pub dimensionally_equivalent: bool,
    /// Empty when equivalent
    pub hint: String,
}

#[derive(Debug)]
struct Expansion {
    name: String,
    exponent: f64,
    log_multiplier: f64,
    path: Vec<String>,
}

/// Running sum of base exponents and the log10 multiplier
#[derive(Debug, Clone)]
pub struct UnitsAccumulator {
    exponents: BTreeMap<String, f64>,
    multiplier: f64,
    undefined: Vec<String>,
}

impl Default for UnitsAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl UnitsAccumulator {
    pub fn new() -> Self {
        Self {
            exponents: BASE_UNITS.iter().map(|b| (b.to_string(), 0.0)).collect(),
            multiplier: 0.0,
            undefined: Vec::new(),
        }
    }

    /// Expand `name` and fold it into the running sums
    ///
    /// `direction` is `1.0` for the first operand of a comparison and `-1.0`
    /// for the second. Units defined in the model shadow the built-in table.
    /// A definition already on the current expansion path is skipped so a
    /// cyclic definition terminates.
    pub fn add_units(&mut self, model: &Model, name: &str, exponent: f64, log_multiplier: f64, direction: f64) {
        let mut pending = vec![Expansion {
            name: name.to_string(),
            exponent,
            log_multiplier,
            path: Vec::new(),
        }];

        while let Some(current) = pending.pop() {
            if current.path.contains(&current.name) {
                continue;
            }

            if let Some(units) = model.units_by_name(&current.name) {
                if units.is_import() {
                    self.mark_undefined(&current.name);
                    continue;
                }
                self.multiplier += direction * current.log_multiplier;
                if units.is_base_unit() {
                    *self.exponents.entry(current.name.clone()).or_insert(0.0) += direction * current.exponent;
                    continue;
                }

                let mut path = current.path.clone();
                path.push(current.name.clone());
                for unit in units.units().iter().rev() {
                    let prefix = unit.prefix.as_deref().and_then(prefix_exponent).unwrap_or(0);
                    let scale = if unit.multiplier > 0.0 {
                        unit.multiplier.log10()
                    } else {
                        0.0
                    };
                    pending.push(Expansion {
                        name: unit.reference.clone(),
                        exponent: unit.exponent * current.exponent,
                        // multiplier * (prefix * reference)^exponent
                        log_multiplier: (scale + f64::from(prefix) * unit.exponent) * current.exponent,
                        path: path.clone(),
                    });
                }
            } else if let Some(standard) = standard_unit(&current.name) {
                for (base, base_exponent) in standard.exponents {
                    *self.exponents.entry(base.to_string()).or_insert(0.0) +=
                        direction * base_exponent * current.exponent;
                }
                self.multiplier += direction * (current.log_multiplier + standard.multiplier * current.exponent);
            } else {
                self.mark_undefined(&current.name);
            }
        }
    }

    fn mark_undefined(&mut self, name: &str) {
        if !self.undefined.iter().any(|u| u == name) {
            self.undefined.push(name.to_string());
        }
    }

    /// Base exponents that did not cancel, `dimensionless` excluded
    pub fn residual_exponents(&self) -> Vec<(&str, f64)> {
        self.exponents
            .iter()
            .filter(|(base, _)| base.as_str() != DIMENSIONLESS)
            .map(|(base, exponent)| (base.as_str(), snap(*exponent)))
            .filter(|(_, exponent)| *exponent != 0.0)
            .collect()
    }

    pub fn residual_multiplier(&self) -> f64 {
        snap(self.multiplier)
    }

    pub fn undefined(&self) -> &[String] {
        &self.undefined
    }

    /// Summarise the sums as a comparison result
    pub fn comparison(&self) -> UnitsComparison {
        if !self.undefined.is_empty() {
            let hint = self
                .undefined
                .iter()
                .map(|name| format!("units '{}' are not defined", name))
                .collect::<Vec<_>>()
                .join(", ");
            return UnitsComparison {
                equivalent: false,
                dimensionally_equivalent: false,
                hint,
            };
        }

        let exponents = self.residual_exponents();
        let multiplier = self.residual_multiplier();
        let mut parts: Vec<String> = exponents
            .iter()
            .map(|(base, exponent)| format!("{}^{}", base, exponent))
            .collect();
        if multiplier != 0.0 {
            parts.push(format!("multiplication factor of 10^{}", multiplier));
        }

        UnitsComparison {
            equivalent: parts.is_empty(),
            dimensionally_equivalent: exponents.is_empty(),
            hint: parts.join(", "),
        }
    }
}

fn snap(value: f64) -> f64 {
    if value.abs() < ZERO_TOLERANCE { 0.0 } else { value }
}

/// Compare the units of two variables
pub fn units_are_equivalent(model: &Model, v1: VariableId, v2: VariableId) -> UnitsComparison {
    units_names_equivalent(model, &model.variable(v1).units, &model.variable(v2).units)
}

/// Compare two units by name
pub fn units_names_equivalent(model: &Model, first: &str, second: &str) -> UnitsComparison {
    let mut accumulator = UnitsAccumulator::new();
    accumulator.add_units(model, first, 1.0, 0.0, 1.0);
    accumulator.add_units(model, second, 1.0, 0.0, -1.0);
    accumulator.comparison()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Unit, Units};

    fn model() -> Model {
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
        model.add_units(Units::new("fmol").with_unit(Unit::new("mole").with_prefix("-15")));
        model
    }

    #[test]
    fn test_derived_chain_matches_direct_declaration() {
        let result = units_names_equivalent(&model(), "per_day", "per_second_scaled");
        assert!(result.equivalent, "{}", result.hint);
        assert!(result.hint.is_empty());
    }

    #[test]
    fn test_prefix_only_mismatch() {
        let result = units_names_equivalent(&model(), "millivolt", "volt");
        assert!(!result.equivalent);
        assert!(result.dimensionally_equivalent);
        assert_eq!(result.hint, "multiplication factor of 10^-3");
    }

    #[test]
    fn test_dimension_mismatch_hint() {
        let result = units_names_equivalent(&model(), "per_day", "metre");
        assert!(!result.dimensionally_equivalent);
        assert!(result.hint.starts_with("metre^-1, second^-1"));
    }

    #[test]
    fn test_integer_prefix() {
        let mut accumulator = UnitsAccumulator::new();
        accumulator.add_units(&model(), "fmol", 1.0, 0.0, 1.0);
        assert_eq!(accumulator.residual_exponents(), vec![("mole", 1.0)]);
        assert_eq!(accumulator.residual_multiplier(), -15.0);
    }

    #[test]
    fn test_prefix_is_raised_to_the_unit_exponent() {
        let mut model = model();
        model.add_units(Units::new("cm3").with_unit(Unit::new("metre").with_prefix("centi").with_exponent(3.0)));
        model.add_units(Units::new("ml").with_unit(Unit::new("litre").with_prefix("milli")));

        let result = units_names_equivalent(&model, "cm3", "ml");
        assert!(result.equivalent, "{}", result.hint);

        let mut accumulator = UnitsAccumulator::new();
        accumulator.add_units(&model, "cm3", 1.0, 0.0, 1.0);
        assert_eq!(accumulator.residual_multiplier(), -6.0);
    }

    #[test]
    fn test_dimensionless_is_ignored() {
        let result = units_names_equivalent(&model(), "dimensionless", "radian");
        assert!(result.equivalent);
    }

    #[test]
    fn test_undefined_units() {
        let result = units_names_equivalent(&model(), "volt", "furlong");
        assert!(!result.equivalent);
        assert_eq!(result.hint, "units 'furlong' are not defined");
    }
}
