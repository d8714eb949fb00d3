//! Configuration system for Grizabella.
//!
//! This module provides a flexible configuration system that supports loading
//! configuration from multiple sources (files, environment variables, etc.)
//! with proper validation and defaults.

mod builder;
mod loader;
mod models;
mod validation;

pub use builder::{ConfigBuilder, DB_PATH_ENV_VAR};
pub use loader::ConfigLoader;
pub use models::*;

/// Default configuration file names that the system will look for.
pub const DEFAULT_CONFIG_FILES: &[&str] = &[
    "grizabella.toml",
    "grizabella.yaml",
    "grizabella.yml",
    "grizabella.json",
    ".grizabella/config.toml",
    ".grizabella/config.yaml",
    ".grizabella/config.yml",
    ".grizabella/config.json",
];

/// Environment variable prefix for Grizabella configuration.
pub const ENV_PREFIX: &str = "GRIZABELLA_";

/// Configuration error type.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration file: {0}")]
    FileLoadError(String),

    #[error("Failed to load environment variables: {0}")]
    EnvLoadError(String),

    #[error("Configuration validation error: {0}")]
    ValidationError(String),

    #[error("Configuration parsing error: {0}")]
    ParseError(String),

    #[error("{0}")]
    Other(String),
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_presets_all_validate() {
        assert!(ConfigBuilder::development().build().is_ok());
        assert!(ConfigBuilder::testing().build().is_ok());
        assert!(ConfigBuilder::minimal().build().is_ok());
    }
}
