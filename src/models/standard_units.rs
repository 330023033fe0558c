//! Built-in units and SI prefixes
//!
//! Every standard unit reduces to exponents over the eight base units plus
//! a base-10 multiplier offset (only `gram`, `liter` and `litre` carry one).

/// The eight base units
pub const BASE_UNITS: [&str; 8] = [
    "ampere",
    "candela",
    "dimensionless",
    "kelvin",
    "kilogram",
    "metre",
    "mole",
    "second",
];

/// A built-in unit expressed over the base units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StandardUnit {
    pub name: &'static str,
    pub exponents: &'static [(&'static str, f64)],
    pub multiplier: f64,
}

macro_rules! standard {
    ($name:expr, [$(($base:expr, $exp:expr)),* $(,)?]) => {
        standard!($name, [$(($base, $exp)),*], 0.0)
    };
    ($name:expr, [$(($base:expr, $exp:expr)),* $(,)?], $mult:expr) => {
        StandardUnit {
            name: $name,
            exponents: &[$(($base, $exp)),*],
            multiplier: $mult,
        }
    };
}

/// Base and derived built-in units, sorted by name
pub const STANDARD_UNITS: &[StandardUnit] = &[
    standard!("ampere", [("ampere", 1.0)]),
    standard!("becquerel", [("second", -1.0)]),
    standard!("candela", [("candela", 1.0)]),
    standard!("coulomb", [("ampere", 1.0), ("second", 1.0)]),
    standard!("dimensionless", [("dimensionless", 1.0)]),
    standard!(
        "farad",
        [("ampere", 2.0), ("kilogram", -1.0), ("metre", -2.0), ("second", 4.0)]
    ),
    standard!("gram", [("kilogram", 1.0)], -3.0),
    standard!("gray", [("metre", 2.0), ("second", -2.0)]),
    standard!(
        "henry",
        [("ampere", -2.0), ("kilogram", 1.0), ("metre", 2.0), ("second", -2.0)]
    ),
    standard!("hertz", [("second", -1.0)]),
    standard!("joule", [("kilogram", 1.0), ("metre", 2.0), ("second", -2.0)]),
    standard!("katal", [("mole", 1.0), ("second", -1.0)]),
    standard!("kelvin", [("kelvin", 1.0)]),
    standard!("kilogram", [("kilogram", 1.0)]),
    standard!("liter", [("metre", 3.0)], -3.0),
    standard!("litre", [("metre", 3.0)], -3.0),
    standard!("lumen", [("candela", 1.0)]),
    standard!("lux", [("candela", 1.0), ("metre", -2.0)]),
    standard!("meter", [("metre", 1.0)]),
    standard!("metre", [("metre", 1.0)]),
    standard!("mole", [("mole", 1.0)]),
    standard!("newton", [("kilogram", 1.0), ("metre", 1.0), ("second", -2.0)]),
    standard!(
        "ohm",
        [("ampere", -2.0), ("kilogram", 1.0), ("metre", 2.0), ("second", -3.0)]
    ),
    standard!("pascal", [("kilogram", 1.0), ("metre", -1.0), ("second", -2.0)]),
    standard!("radian", [("dimensionless", 1.0)]),
    standard!("second", [("second", 1.0)]),
    standard!(
        "siemens",
        [("ampere", 2.0), ("kilogram", -1.0), ("metre", -2.0), ("second", 3.0)]
    ),
    standard!("sievert", [("metre", 2.0), ("second", -2.0)]),
    standard!("steradian", [("dimensionless", 1.0)]),
    standard!("tesla", [("ampere", -1.0), ("kilogram", 1.0), ("second", -2.0)]),
    standard!(
        "volt",
        [("ampere", -1.0), ("kilogram", 1.0), ("metre", 2.0), ("second", -3.0)]
    ),
    standard!("watt", [("kilogram", 1.0), ("metre", 2.0), ("second", -3.0)]),
    standard!(
        "weber",
        [("ampere", -1.0), ("kilogram", 1.0), ("metre", 2.0), ("second", -2.0)]
    ),
];

/// Named SI prefixes and their powers of ten
pub const SI_PREFIXES: &[(&str, i32)] = &[
    ("yotta", 24),
    ("zetta", 21),
    ("exa", 18),
    ("peta", 15),
    ("tera", 12),
    ("giga", 9),
    ("mega", 6),
    ("kilo", 3),
    ("hecto", 2),
    ("deca", 1),
    ("deka", 1),
    ("deci", -1),
    ("centi", -2),
    ("milli", -3),
    ("micro", -6),
    ("nano", -9),
    ("pico", -12),
    ("femto", -15),
    ("atto", -18),
    ("zepto", -21),
    ("yocto", -24),
];

pub fn standard_unit(name: &str) -> Option<&'static StandardUnit> {
    STANDARD_UNITS
        .binary_search_by(|u| u.name.cmp(name))
        .ok()
        .map(|i| &STANDARD_UNITS[i])
}

pub fn is_standard_unit(name: &str) -> bool {
    standard_unit(name).is_some()
}

pub fn is_base_unit(name: &str) -> bool {
    BASE_UNITS.contains(&name)
}

/// Power of ten named by a prefix: a named SI prefix or an integer literal
pub fn prefix_exponent(prefix: &str) -> Option<i32> {
    if let Some((_, exp)) = SI_PREFIXES.iter().find(|(name, _)| *name == prefix) {
        return Some(*exp);
    }
    crate::validation::input::parse_integer(prefix).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_sorted_for_lookup() {
        assert!(STANDARD_UNITS.windows(2).all(|w| w[0].name < w[1].name));
        assert_eq!(STANDARD_UNITS.len(), 33);
    }

    #[test]
    fn test_base_units_are_standard() {
        for name in BASE_UNITS {
            let unit = standard_unit(name).unwrap();
            assert_eq!(unit.exponents, &[(name, 1.0)]);
        }
    }

    #[test]
    fn test_gram_multiplier() {
        let gram = standard_unit("gram").unwrap();
        assert_eq!(gram.multiplier, -3.0);
        assert!(standard_unit("fathom").is_none());
    }

    #[test]
    fn test_charge_and_capacitance_rows() {
        // C = A s, F = C / V = A^2 s^4 kg^-1 m^-2
        assert_eq!(
            standard_unit("coulomb").unwrap().exponents,
            &[("ampere", 1.0), ("second", 1.0)]
        );
        assert_eq!(
            standard_unit("farad").unwrap().exponents,
            &[("ampere", 2.0), ("kilogram", -1.0), ("metre", -2.0), ("second", 4.0)]
        );
    }

    #[test]
    fn test_prefix_exponent() {
        assert_eq!(prefix_exponent("milli"), Some(-3));
        assert_eq!(prefix_exponent("deka"), Some(1));
        assert_eq!(prefix_exponent("-4"), Some(-4));
        assert_eq!(prefix_exponent("mili"), None);
    }
}
