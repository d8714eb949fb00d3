//! Configuration validation utilities.

use super::models::*;
use super::ConfigError;

/// Validate the entire configuration.
pub fn validate_config(config: &GrizabellaConfig) -> Result<(), ConfigError> {
    validate_pool_config(&config.storage.pool)?;
    validate_embedding_config(&config.embedding)?;
    Ok(())
}

fn validate_pool_config(config: &PoolConfig) -> Result<(), ConfigError> {
    if config.max_connections_per_type == 0 {
        return Err(ConfigError::ValidationError(
            "pool max_connections_per_type must be greater than 0".to_string(),
        ));
    }
    Ok(())
}

fn validate_embedding_config(config: &EmbeddingConfig) -> Result<(), ConfigError> {
    if config.default_dimensions == 0 {
        return Err(ConfigError::ValidationError(
            "embedding default_dimensions must be greater than 0".to_string(),
        ));
    }
    if config.default_model.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "embedding default_model cannot be empty".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_pool_size_is_rejected() {
        let mut config = GrizabellaConfig::default();
        config.storage.pool.max_connections_per_type = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&GrizabellaConfig::default()).is_ok());
    }
}
