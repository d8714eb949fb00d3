//! Configuration builder.
//!
//! This module provides a builder pattern API for creating configurations.

use super::{models::*, validation, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable holding the fallback database path for server mode.
pub const DB_PATH_ENV_VAR: &str = "GRIZABELLA_DB_PATH";

/// Builder for creating [`GrizabellaConfig`] instances.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: GrizabellaConfig,
}

impl ConfigBuilder {
    /// Create a new configuration builder with default values.
    pub fn new() -> Self {
        Self {
            config: GrizabellaConfig::default(),
        }
    }

    /// Set the base data directory (the instance root holding `sqlite.db`,
    /// `lancedb_data/`, `kuzu_data/`).
    pub fn with_data_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config.storage.data_dir = path.as_ref().to_path_buf();
        self
    }

    /// Read `GRIZABELLA_DB_PATH` and use it as the data directory if set and
    /// no data directory has been configured yet.
    pub fn with_db_path_from_env(mut self) -> Self {
        if self.config.storage.data_dir.as_os_str().is_empty() {
            if let Ok(path) = std::env::var(DB_PATH_ENV_VAR) {
                tracing::info!(path = %path, "using {} for database path", DB_PATH_ENV_VAR);
                self.config.storage.data_dir = PathBuf::from(path);
            }
        }
        self
    }

    /// Set the per-substrate connection pool size.
    pub fn with_pool_size(mut self, max_connections_per_type: usize) -> Self {
        self.config.storage.pool.max_connections_per_type = max_connections_per_type;
        self
    }

    /// Set how long idle pooled connections are kept before eviction.
    pub fn with_max_idle_time(mut self, max_idle_time: Duration) -> Self {
        self.config.storage.pool.max_idle_time = max_idle_time;
        self
    }

    /// Set the default embedding model identifier.
    pub fn with_embedding_model(mut self, model_name: impl Into<String>) -> Self {
        self.config.embedding.default_model = model_name.into();
        self
    }

    /// Set the default embedding dimensionality.
    pub fn with_embedding_dimensions(mut self, dimensions: usize) -> Self {
        self.config.embedding.default_dimensions = dimensions;
        self
    }

    /// Set the log level.
    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.config.logging.level = level;
        self
    }

    /// Configure logging to a file.
    pub fn with_log_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config.logging.file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Use default logging configuration (console output at Info level).
    pub fn with_default_logging(mut self) -> Self {
        self.config.logging.level = LogLevel::Info;
        self.config.logging.format = LogFormat::Json;
        self.config.logging.file = None;
        self
    }

    /// Enable the background resource monitor.
    pub fn with_resource_monitor(mut self, sample_interval: Duration) -> Self {
        self.config.resource_monitor.enabled = true;
        self.config.resource_monitor.sample_interval = sample_interval;
        self
    }

    /// Configuration for development: a scratch data directory under the
    /// current working directory and debug-level logging.
    pub fn development() -> Self {
        Self::new()
            .with_data_dir("./grizabella_dev_data")
            .with_log_level(LogLevel::Debug)
    }

    /// Configuration suitable for automated testing: a dedicated data
    /// directory and a small connection pool.
    pub fn testing() -> Self {
        Self::development()
            .with_data_dir("./grizabella_test_data")
            .with_pool_size(2)
    }

    /// Production-ready configuration with a per-user data directory and
    /// standard logging, honoring `GRIZABELLA_DB_PATH` if set.
    pub fn production() -> Self {
        Self::new()
            .with_default_logging()
            .with_db_path_from_env()
    }

    /// Equivalent to [`ConfigBuilder::production`]; provided for parity with
    /// the preset constructors below.
    pub fn defaults() -> Self {
        Self::production()
    }

    /// Minimal configuration for quick prototyping: defaults with terse
    /// logging and no resource monitor.
    pub fn minimal() -> Self {
        Self::new().with_log_level(LogLevel::Warn)
    }

    /// Build the configuration, validating it in the process.
    pub fn build(self) -> Result<GrizabellaConfig> {
        validation::validate_config(&self.config)?;
        Ok(self.config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_data_dir_and_pool_size() {
        let config = ConfigBuilder::new()
            .with_data_dir("/tmp/griz")
            .with_pool_size(10)
            .build()
            .unwrap();
        assert_eq!(config.storage.data_dir, PathBuf::from("/tmp/griz"));
        assert_eq!(config.storage.pool.max_connections_per_type, 10);
    }

    #[test]
    fn testing_preset_uses_small_pool() {
        let config = ConfigBuilder::testing().build().unwrap();
        assert_eq!(config.storage.pool.max_connections_per_type, 2);
    }

    #[test]
    fn env_var_is_only_used_when_data_dir_unset() {
        // SAFETY: test-local env mutation, no other test reads this var concurrently.
        unsafe {
            std::env::set_var(DB_PATH_ENV_VAR, "/from/env");
        }
        let config = ConfigBuilder::new().with_db_path_from_env().build().unwrap();
        assert_eq!(config.storage.data_dir, PathBuf::from("/from/env"));
        unsafe {
            std::env::remove_var(DB_PATH_ENV_VAR);
        }
    }
}
