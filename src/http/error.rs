//! HTTP mapping for [`FormgateError`].

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;

use crate::error::FormgateError;

/// JSON body returned for failed API calls.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Error code (e.g. "unknown_limiter", "invalid_request")
    pub error: &'static str,
    /// Human-readable detail
    pub detail: String,
}

impl IntoResponse for FormgateError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            FormgateError::UnknownLimiter(_) => (StatusCode::NOT_FOUND, "unknown_limiter"),
            FormgateError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
            FormgateError::Config(_) => (StatusCode::BAD_REQUEST, "config"),
            FormgateError::Io(e) => {
                error!(error = %e, "I/O error while serving request");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
        };

        let body = ErrorBody {
            error: code,
            detail: self.to_string(),
        };

        (status, Json(body)).into_response()
    }
}
