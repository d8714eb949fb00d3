//! The crate's top-level error taxonomy.
//!
//! Each of the six categories named in the error handling design is a
//! variant here; adapters raise their own narrower error type and convert
//! into this one at the boundary, the same pattern `StorageError` /
//! `LocaiError` follow in the teacher crate this workspace is descended from.

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GrizabellaError {
    /// Definition-level violations and references to missing definitions.
    #[error("schema error: {0}")]
    Schema(String),

    /// Constraint violations, missing instances on update.
    #[error("instance error: {0}")]
    Instance(String),

    /// Connection loss, driver errors, lock contention.
    #[error("database error: {0}")]
    Database(String),

    /// Model load/inference failures, dimensionality mismatch.
    #[error("embedding error: {0}")]
    Embedding(String),

    /// Bad paths / env.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Malformed inputs at the boundary.
    #[error("validation error: {0}")]
    Validation(String),
}

/// The category tag carried by the remote tool-call surface's structured
/// error envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    SchemaError,
    InstanceError,
    DatabaseError,
    EmbeddingError,
    ValidationError,
    InternalError,
}

impl GrizabellaError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            GrizabellaError::Schema(_) => ErrorCategory::SchemaError,
            GrizabellaError::Instance(_) => ErrorCategory::InstanceError,
            GrizabellaError::Database(_) => ErrorCategory::DatabaseError,
            GrizabellaError::Embedding(_) => ErrorCategory::EmbeddingError,
            GrizabellaError::Configuration(_) => ErrorCategory::InternalError,
            GrizabellaError::Validation(_) => ErrorCategory::ValidationError,
        }
    }
}

/// The structured error envelope returned by the remote tool-call surface.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorEnvelope {
    pub category: ErrorCategory,
    pub message: String,
}

impl From<&GrizabellaError> for ErrorEnvelope {
    fn from(err: &GrizabellaError) -> Self {
        Self {
            category: err.category(),
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, GrizabellaError>;

impl From<crate::config::ConfigError> for GrizabellaError {
    fn from(err: crate::config::ConfigError) -> Self {
        GrizabellaError::Configuration(err.to_string())
    }
}

impl From<std::io::Error> for GrizabellaError {
    fn from(err: std::io::Error) -> Self {
        GrizabellaError::Configuration(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_errors_map_to_internal_error_category() {
        let err = GrizabellaError::Configuration("bad path".into());
        assert_eq!(err.category(), ErrorCategory::InternalError);
    }

    #[test]
    fn schema_error_serializes_with_snake_case_category() {
        let err = GrizabellaError::Schema("missing OTD".into());
        let envelope = ErrorEnvelope::from(&err);
        let json = serde_json::to_string(&envelope).unwrap();
        assert!(json.contains("\"schema_error\""));
    }
}
