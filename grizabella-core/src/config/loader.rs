//! Configuration loader.
//!
//! This module provides functionality to load configuration from multiple
//! sources: defaults, config files, and environment variables, in that order
//! of increasing precedence.

use super::{models::*, validation, ConfigError, Result, DEFAULT_CONFIG_FILES, ENV_PREFIX};
use figment::{
    providers::{Env, Format, Json, Serialized, Toml, Yaml},
    Figment,
};
use std::path::{Path, PathBuf};

/// Configuration loader that handles loading from multiple sources.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    figment: Figment,
}

impl ConfigLoader {
    /// Create a new configuration loader seeded with defaults.
    pub fn new() -> Self {
        let figment = Figment::new().merge(Serialized::defaults(GrizabellaConfig::default()));
        Self { figment }
    }

    /// Load configuration from a file.
    pub fn load_file<P: AsRef<Path>>(&mut self, path: P) -> Result<&mut Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileLoadError(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => {
                self.figment = std::mem::take(&mut self.figment).merge(Toml::file(path));
            }
            Some("yaml") | Some("yml") => {
                self.figment = std::mem::take(&mut self.figment).merge(Yaml::file(path));
            }
            Some("json") => {
                self.figment = std::mem::take(&mut self.figment).merge(Json::file(path));
            }
            _ => {
                return Err(ConfigError::FileLoadError(format!(
                    "Unsupported file format: {}",
                    path.display()
                )));
            }
        }

        Ok(self)
    }

    /// Attempt to load from default configuration file locations.
    pub fn load_default_files(&mut self) -> &mut Self {
        for file in DEFAULT_CONFIG_FILES {
            let path = PathBuf::from(file);
            if path.exists() && self.load_file(&path).is_ok() {
                break;
            }
        }

        if let Some(proj_dirs) = directories::ProjectDirs::from("com", "grizabella", "grizabella")
        {
            let config_dir = proj_dirs.config_dir();
            for ext in &["toml", "yaml", "yml", "json"] {
                let path = config_dir.join(format!("config.{ext}"));
                if path.exists() && self.load_file(&path).is_ok() {
                    break;
                }
            }
        }

        self
    }

    /// Load configuration from environment variables prefixed `GRIZABELLA_`.
    pub fn load_env(&mut self) -> &mut Self {
        self.figment = std::mem::take(&mut self.figment).merge(Env::prefixed(ENV_PREFIX));
        self
    }

    /// Load configuration from a custom source.
    pub fn merge<T: figment::Provider>(&mut self, provider: T) -> &mut Self {
        self.figment = std::mem::take(&mut self.figment).merge(provider);
        self
    }

    /// Extract and validate the configuration.
    pub fn extract(&self) -> Result<GrizabellaConfig> {
        let config: GrizabellaConfig = self
            .figment
            .extract()
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        validation::validate_config(&config)?;

        Ok(config)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_with_no_overrides_yields_defaults() {
        let loader = ConfigLoader::new();
        let config = loader.extract().unwrap();
        assert_eq!(
            config.storage.pool.max_connections_per_type,
            GrizabellaConfig::default().storage.pool.max_connections_per_type
        );
    }

    #[test]
    fn missing_file_is_reported() {
        let mut loader = ConfigLoader::new();
        assert!(loader.load_file("/nonexistent/grizabella.toml").is_err());
    }
}
