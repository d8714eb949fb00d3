//! Configuration model definitions.
//!
//! This module contains the configuration structures for all Grizabella
//! components.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Main configuration structure for Grizabella.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GrizabellaConfig {
    /// Storage configuration
    pub storage: StorageConfig,

    /// Embedding-model configuration
    pub embedding: EmbeddingConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Resource monitor configuration
    pub resource_monitor: ResourceMonitorConfig,
}

/// Configuration for the three substrate stores and their connection pools.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root directory holding `sqlite.db`, `lancedb_data/`, `kuzu_data/`.
    /// Empty means "resolve per-user default at connect time".
    pub data_dir: PathBuf,

    pub pool: PoolConfig,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::new(),
            pool: PoolConfig::default(),
        }
    }
}

/// Connection pool sizing, shared by the relational, vector, and graph pools.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Maximum idle connections kept per database path, per substrate.
    pub max_connections_per_type: usize,

    /// Connections idle beyond this are evicted in the background.
    #[serde(with = "humantime_serde")]
    pub max_idle_time: Duration,

    /// How long `acquire` may suspend before giving up.
    #[serde(with = "humantime_serde")]
    pub acquire_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections_per_type: 5,
            max_idle_time: Duration::from_secs(300),
            acquire_timeout: Duration::from_secs(30),
        }
    }
}

/// Default embedding-model settings. An individual `EmbeddingDefinition` may
/// still name a different model identifier and dimensionality; these are
/// only the fallback used when a caller doesn't specify one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Default model identifier passed to the vector adapter's model cache.
    pub default_model: String,

    /// Default vector dimensionality for new embedding definitions.
    pub default_dimensions: usize,

    /// Maximum number of loaded models kept in the model cache.
    pub model_cache_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            default_model: "stub-embedding".to_string(),
            default_dimensions: 384,
            model_cache_size: 8,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: LogLevel,

    /// Log format
    pub format: LogFormat,

    /// File to log to (if any)
    pub file: Option<PathBuf>,

    /// Whether to log to stdout
    pub stdout: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Pretty,
            file: None,
            stdout: true,
        }
    }
}

/// Log level.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(format!("Invalid log level: {}", s)),
        }
    }
}

/// Log format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Compact,
    Pretty,
}

/// Configuration for the optional background resource monitor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceMonitorConfig {
    pub enabled: bool,

    #[serde(with = "humantime_serde")]
    pub sample_interval: Duration,
}

impl Default for ResourceMonitorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            sample_interval: Duration::from_secs(60),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sane_pool_size() {
        let config = GrizabellaConfig::default();
        assert_eq!(config.storage.pool.max_connections_per_type, 5);
    }

    #[test]
    fn log_level_round_trips_through_display_and_from_str() {
        for level in [
            LogLevel::Trace,
            LogLevel::Debug,
            LogLevel::Info,
            LogLevel::Warn,
            LogLevel::Error,
        ] {
            let parsed: LogLevel = level.to_string().parse().unwrap();
            assert_eq!(parsed, level);
        }
    }

    #[test]
    fn invalid_log_level_string_is_rejected() {
        assert!("not-a-level".parse::<LogLevel>().is_err());
    }
}
