//! Resolve command implementation

use std::path::Path;

use crate::cli::commands::{check_issues, load_config, load_model};
use crate::cli::error::CliError;
use crate::cli::output::{format_issues, format_model_summary};
use crate::export::{EntitySerializer, JsonSerializer};

/// Handle the resolve command
///
/// Prints the flattened model as JSON when `json` is set, otherwise a summary.
pub fn handle_resolve(input: &Path, json: bool, config: Option<&Path>) -> Result<(), CliError> {
    let config = load_config(config)?;
    let loaded = load_model(input, &config)?;

    if json {
        let result = JsonSerializer::pretty().serialize_model(&loaded.model)?;
        println!("{}", result.content);
        if !loaded.issues.is_empty() {
            eprint!("{}", format_issues("Import resolution", &loaded.issues));
        }
    } else {
        print!("{}", format_model_summary(&loaded.model));
        print!("{}", format_issues("Import resolution", &loaded.issues));
    }

    check_issues(&loaded.issues)
}
