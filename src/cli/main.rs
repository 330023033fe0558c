//! cellml-cli: validate, resolve and generate code from model documents

use std::path::PathBuf;

use anyhow::Context;
use cellml_sdk::cli::commands::{generate::handle_generate, resolve::handle_resolve, validate::handle_validate};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "cellml-cli")]
#[command(about = "Model validation, import resolution and code generation", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve imports and check the whole model
    Validate {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Resolve imports and print the flattened model
    Resolve {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Print the model as JSON
        #[arg(long)]
        json: bool,
    },
    /// Generate code for the first component with math
    Generate {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Output language: c or python
        #[arg(long)]
        profile: Option<String>,
        /// Directory to write files to; stdout when omitted
        #[arg(long, value_name = "DIR")]
        out_dir: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.config.as_deref();

    match cli.command {
        Commands::Validate { file } => {
            handle_validate(&file, config).with_context(|| format!("validate {}", file.display()))
        }
        Commands::Resolve { file, json } => {
            handle_resolve(&file, json, config).with_context(|| format!("resolve {}", file.display()))
        }
        Commands::Generate {
            file,
            profile,
            out_dir,
        } => handle_generate(&file, profile.as_deref(), out_dir.as_deref(), config)
            .with_context(|| format!("generate {}", file.display())),
    }
}
