//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::ServiceError;
use ingest::SourceError;

const INTERNAL_ERROR_MESSAGE: &str = "internal server error";

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Order service error.
    Service(ServiceError),
    /// Ingestion queue error.
    Queue(SourceError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Service(err) => service_error_to_response(err),
            ApiError::Queue(err) => queue_error_to_response(err),
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

/// Only not-found and bad-identifier outcomes are shown to the client; the
/// rest are logged and reported as an opaque internal error.
fn service_error_to_response(err: ServiceError) -> (StatusCode, String) {
    match &err {
        ServiceError::NotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
        ServiceError::InvalidIdentifier => (StatusCode::BAD_REQUEST, err.to_string()),
        _ => {
            tracing::error!(kind = err.kind(), error = %err, "internal server error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                INTERNAL_ERROR_MESSAGE.to_string(),
            )
        }
    }
}

fn queue_error_to_response(err: SourceError) -> (StatusCode, String) {
    match &err {
        SourceError::Closed => (StatusCode::SERVICE_UNAVAILABLE, err.to_string()),
        SourceError::Transport(_) => {
            tracing::error!(error = %err, "internal server error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                INTERNAL_ERROR_MESSAGE.to_string(),
            )
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        ApiError::Service(err)
    }
}

impl From<SourceError> for ApiError {
    fn from(err: SourceError) -> Self {
        ApiError::Queue(err)
    }
}
