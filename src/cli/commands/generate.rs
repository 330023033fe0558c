//! Generate command implementation

use std::path::Path;

use crate::cli::commands::{check_issues, load_config, load_model};
use crate::cli::error::CliError;
use crate::cli::output::format_issues;
use crate::config::ProfileKind;
use crate::generator::Generator;
use crate::storage::{FileSystemStorageBackend, StorageBackend};

/// Parse a `--profile` value
pub fn parse_profile(name: &str) -> Result<ProfileKind, CliError> {
    match name.to_ascii_lowercase().as_str() {
        "c" => Ok(ProfileKind::C),
        "python" | "py" => Ok(ProfileKind::Python),
        other => Err(CliError::InvalidArgument(format!("Unknown profile: {}", other))),
    }
}

/// Output file names for a profile: (interface, implementation)
fn file_names(kind: ProfileKind, interface_file_name: &str) -> (String, String) {
    let stem = interface_file_name
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(interface_file_name);
    match kind {
        ProfileKind::C => (interface_file_name.to_string(), format!("{}.c", stem)),
        ProfileKind::Python => (String::new(), format!("{}.py", stem)),
    }
}

/// Handle the generate command
pub fn handle_generate(
    input: &Path,
    profile: Option<&str>,
    out_dir: Option<&Path>,
    config: Option<&Path>,
) -> Result<(), CliError> {
    let mut config = load_config(config)?;
    if let Some(name) = profile {
        config.profile = parse_profile(name)?;
    }
    let kind = config.profile;
    let interface_file_name = config.interface_file_name.clone();

    let loaded = load_model(input, &config)?;
    check_issues(&loaded.issues).inspect_err(|_| {
        eprint!("{}", format_issues("Import resolution", &loaded.issues));
    })?;

    let mut generator = Generator::from_config(config);
    let code = generator.generate_code(&loaded.model);
    if !generator.issues().is_empty() {
        eprint!("{}", format_issues("Code generation", generator.issues()));
    }
    check_issues(generator.issues())?;

    let (interface_name, implementation_name) = file_names(kind, &interface_file_name);
    match out_dir {
        Some(directory) => {
            let backend = FileSystemStorageBackend::new(directory);
            if !code.interface.is_empty() {
                backend.write_file(&interface_name, code.interface.as_bytes())?;
                println!("Wrote {}", directory.join(&interface_name).display());
            }
            backend.write_file(&implementation_name, code.implementation.as_bytes())?;
            println!("Wrote {}", directory.join(&implementation_name).display());
        }
        None => {
            if !code.interface.is_empty() {
                println!("// {}\n{}", interface_name, code.interface);
            }
            print!("{}", code.implementation);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_names_follow_profile() {
        assert_eq!(
            file_names(ProfileKind::C, "model.h"),
            ("model.h".to_string(), "model.c".to_string())
        );
        assert_eq!(file_names(ProfileKind::Python, "model.h").1, "model.py");
        assert!(parse_profile("fortran").is_err());
    }
}
