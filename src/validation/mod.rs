//! Validation functionality
//!
//! Provides validation logic for:
//! - Identifier and numeric literal rules
//! - Units dimensional equivalence
//! - Units and equivalence cycle detection
//! - Whole-model checks collected as issues

pub mod cycles;
pub mod input;
pub mod units;
pub mod validator;

pub use cycles::{EquivalenceCycle, UnitsCycle, find_equivalence_cycles, find_units_cycles};
pub use input::{ValidationError, ValidationResult};
pub use units::{UnitsAccumulator, UnitsComparison, units_are_equivalent, units_names_equivalent};
pub use validator::Validator;
