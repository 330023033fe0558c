//! Command-line driver over the public API
//!
//! Compiled only with the `cli` feature; the `cellml-cli` binary in
//! `main.rs` dispatches to [`commands`].

pub mod commands;
pub mod error;
pub mod output;

pub use error::CliError;
