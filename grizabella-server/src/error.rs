//! Maps `GrizabellaError` onto the structured error envelope the remote
//! tool-call surface returns (spec §6: "errors are returned as structured
//! error objects carrying a category ... and a message").

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use grizabella_core::error::{ErrorCategory, ErrorEnvelope, GrizabellaError};
use serde::Serialize;

/// Newtype wrapper so the foreign `GrizabellaError` can implement axum's
/// `IntoResponse` from within this crate.
pub struct ApiError(pub GrizabellaError);

impl From<GrizabellaError> for ApiError {
    fn from(err: GrizabellaError) -> Self {
        Self(err)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorEnvelope,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let envelope = ErrorEnvelope::from(&self.0);
        // Every error is non-fatal to the transport; the status code is a
        // convenience for HTTP-aware clients, the envelope is authoritative.
        let status = match envelope.category {
            ErrorCategory::SchemaError => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorCategory::InstanceError => StatusCode::CONFLICT,
            ErrorCategory::DatabaseError => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCategory::EmbeddingError => StatusCode::BAD_GATEWAY,
            ErrorCategory::ValidationError => StatusCode::BAD_REQUEST,
            ErrorCategory::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(ErrorBody { error: envelope })).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
