//! Identifier and numeric literal rules.
//!
//! These helpers are shared by the document parser, the validator and the
//! code generator so that every pass agrees on what a valid name or number
//! looks like.
//!
//! # Rules
//!
//! - Identifiers start with a letter or underscore, contain only ASCII
//!   letters, digits and underscores, and contain at least one letter
//! - Real literals are an optional `-`, digits with at most one decimal
//!   point, and an optional `e`/`E` exponent with an optional sign
//! - Integer literals are an optional sign followed by digits

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::models::standard_units::is_standard_unit;

static IDENTIFIER_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

static REAL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?$").unwrap());

static INTEGER_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[+-]?\d+$").unwrap());

/// Errors that can occur during input validation.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    /// Input is empty when a value is required
    #[error("{0} cannot be empty")]
    Empty(&'static str),

    /// Input contains invalid characters
    #[error("{field} contains invalid characters: {reason}")]
    InvalidCharacters { field: &'static str, reason: String },

    /// Input has invalid format
    #[error("{0}: {1}")]
    InvalidFormat(&'static str, String),

    /// Input is a reserved word
    #[error("{field} cannot be a reserved word: {word}")]
    ReservedWord { field: &'static str, word: String },
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validate a model, component or variable name.
///
/// # Examples
///
/// ```
/// use cellml_sdk::validation::input::validate_identifier;
///
/// assert!(validate_identifier("membrane", "component name").is_ok());
/// assert!(validate_identifier("_V2", "variable name").is_ok());
/// assert!(validate_identifier("2V", "variable name").is_err());
/// assert!(validate_identifier("__", "variable name").is_err());
/// ```
pub fn validate_identifier(name: &str, field: &'static str) -> ValidationResult<()> {
    if name.is_empty() {
        return Err(ValidationError::Empty(field));
    }

    let first_char = match name.chars().next() {
        Some(c) => c,
        None => return Err(ValidationError::Empty(field)),
    };
    if first_char.is_ascii_digit() {
        return Err(ValidationError::InvalidFormat(
            field,
            "must not begin with a European numeric character [0-9]".to_string(),
        ));
    }

    if !IDENTIFIER_REGEX.is_match(name) {
        return Err(ValidationError::InvalidCharacters {
            field,
            reason: "only alphanumeric characters and underscores are allowed".to_string(),
        });
    }

    if !name.chars().any(|c| c.is_ascii_alphabetic()) {
        return Err(ValidationError::InvalidFormat(
            field,
            "must contain at least one alphabetic character".to_string(),
        ));
    }

    Ok(())
}

/// Validate the name of a units definition. Standard unit names are reserved.
pub fn validate_units_name(name: &str) -> ValidationResult<()> {
    validate_identifier(name, "units name")?;
    if is_standard_unit(name) {
        return Err(ValidationError::ReservedWord {
            field: "units name",
            word: name.to_string(),
        });
    }
    Ok(())
}

pub fn is_real_literal(text: &str) -> bool {
    REAL_REGEX.is_match(text)
}

pub fn is_integer_literal(text: &str) -> bool {
    INTEGER_REGEX.is_match(text)
}

/// Parse a real number literal
pub fn parse_real(text: &str) -> ValidationResult<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty("real number"));
    }
    if !is_real_literal(trimmed) {
        return Err(ValidationError::InvalidFormat(
            "real number",
            format!("'{}' is not a valid real number", text),
        ));
    }
    trimmed
        .parse::<f64>()
        .map_err(|e| ValidationError::InvalidFormat("real number", e.to_string()))
}

/// Parse an integer literal
pub fn parse_integer(text: &str) -> ValidationResult<i32> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty("integer"));
    }
    if !is_integer_literal(trimmed) {
        return Err(ValidationError::InvalidFormat(
            "integer",
            format!("'{}' is not a valid integer", text),
        ));
    }
    trimmed
        .parse::<i32>()
        .map_err(|e| ValidationError::InvalidFormat("integer", e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_identifiers() {
        for name in ["V", "membrane_potential", "_x1", "a_"] {
            assert!(validate_identifier(name, "variable name").is_ok(), "{}", name);
        }
    }

    #[test]
    fn test_invalid_identifiers() {
        assert_eq!(
            validate_identifier("", "variable name"),
            Err(ValidationError::Empty("variable name"))
        );
        assert!(matches!(
            validate_identifier("1abc", "variable name"),
            Err(ValidationError::InvalidFormat(..))
        ));
        assert!(matches!(
            validate_identifier("a-b", "variable name"),
            Err(ValidationError::InvalidCharacters { .. })
        ));
        assert!(matches!(
            validate_identifier("_1", "variable name"),
            Err(ValidationError::InvalidFormat(..))
        ));
    }

    #[test]
    fn test_standard_units_names_are_reserved() {
        assert!(matches!(
            validate_units_name("second"),
            Err(ValidationError::ReservedWord { .. })
        ));
        assert!(validate_units_name("millisecond").is_ok());
    }

    #[test]
    fn test_parse_real() {
        assert_eq!(parse_real("1").unwrap(), 1.0);
        assert_eq!(parse_real("-2.5").unwrap(), -2.5);
        assert_eq!(parse_real("1.5e3").unwrap(), 1500.0);
        assert_eq!(parse_real("1E-3").unwrap(), 0.001);
        assert_eq!(parse_real(".5").unwrap(), 0.5);
        assert_eq!(parse_real("3.").unwrap(), 3.0);
    }

    #[test]
    fn test_parse_real_rejects_malformed_text() {
        for text in ["", "+1", "1.2.3", "abc", "1e", ".", "1e2.5", "- 1", "NaN"] {
            assert!(parse_real(text).is_err(), "{}", text);
        }
    }

    #[test]
    fn test_parse_integer() {
        assert_eq!(parse_integer("3").unwrap(), 3);
        assert_eq!(parse_integer("-12").unwrap(), -12);
        assert_eq!(parse_integer("+4").unwrap(), 4);
        assert!(parse_integer("1.0").is_err());
        assert!(parse_integer("").is_err());
    }
}
