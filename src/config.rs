//! Engine configuration

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::issue::Level;

/// Errors raised while loading configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {0}: {1}")]
    Io(String, String),

    #[error("Invalid config: {0}")]
    Parse(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        ConfigError::Parse(e.to_string())
    }
}

/// How malformed numeric text is reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LiteralPolicy {
    /// Report as a warning and continue with the fallback value
    #[default]
    Lenient,
    /// Report as an error; the fallback value is still used so the pass can finish
    Strict,
}

impl LiteralPolicy {
    pub fn level(&self) -> Level {
        match self {
            LiteralPolicy::Lenient => Level::Warning,
            LiteralPolicy::Strict => Level::Error,
        }
    }
}

/// Output language of the code generator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileKind {
    #[default]
    C,
    Python,
}

/// Configuration shared by the parser, resolver and generator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Severity of malformed numeric literals
    pub numeric_literals: LiteralPolicy,

    /// Default generator profile
    pub profile: ProfileKind,

    /// Header name included by generated C implementations
    pub interface_file_name: String,

    /// Refuse to read import documents outside the base directory
    pub confine_imports: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            numeric_literals: LiteralPolicy::Lenient,
            profile: ProfileKind::C,
            interface_file_name: "model.h".to_string(),
            confine_imports: false,
        }
    }
}

impl EngineConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder for custom configuration
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.display().to_string(), e.to_string()))?;
        Self::from_toml_str(&text)
    }
}

/// Builder for EngineConfig
#[derive(Debug, Default)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    pub fn numeric_literals(mut self, policy: LiteralPolicy) -> Self {
        self.config.numeric_literals = policy;
        self
    }

    pub fn profile(mut self, profile: ProfileKind) -> Self {
        self.config.profile = profile;
        self
    }

    pub fn interface_file_name(mut self, name: impl Into<String>) -> Self {
        self.config.interface_file_name = name.into();
        self
    }

    pub fn confine_imports(mut self, confine: bool) -> Self {
        self.config.confine_imports = confine;
        self
    }

    /// Build the configuration
    pub fn build(self) -> EngineConfig {
        self.config
    }
}
