//! Validate command implementation

use std::path::Path;

use crate::cli::commands::{check_issues, load_config, load_model};
use crate::cli::error::CliError;
use crate::cli::output::format_issues;
use crate::validation::Validator;

/// Handle the validate command
pub fn handle_validate(input: &Path, config: Option<&Path>) -> Result<(), CliError> {
    let config = load_config(config)?;
    let mut loaded = load_model(input, &config)?;

    let mut validator = Validator::with_config(config);
    validator.validate_model(&loaded.model);
    loaded.issues.extend(validator.take_issues());

    print!("{}", format_issues(&format!("Validation of {}", input.display()), &loaded.issues));
    check_issues(&loaded.issues)?;

    println!("Validation successful");
    Ok(())
}
