//! HTTP error responses
//!
//! Every error answers `{"success": false, "error": <status>, "message": <text>}`.
//! Authorization failures never reach this module: the permission layer
//! answers them with the same shape before a handler runs.

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::debug;

use crate::model::ValidationError;
use crate::store::StoreError;

/// Result type for handlers
pub type ApiResult<T> = Result<T, ApiError>;

/// Handler failures, one per response class
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed request body
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Unknown route, id or empty collection
    #[error("resource not found: {0}")]
    NotFound(String),

    /// Well-formed body that fails validation
    #[error("unprocessable: {0}")]
    Unprocessable(String),
}

impl ApiError {
    /// Response status
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }

    /// Fixed message for the response body
    pub fn message(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad request",
            Self::NotFound(_) => "resource not found",
            Self::Unprocessable(_) => "unprocessable",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        debug!(status = status.as_u16(), error = %self, "Request failed");
        let body = json!({
            "success": false,
            "error": status.as_u16(),
            "message": self.message(),
        });
        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { .. } => Self::NotFound(err.to_string()),
            StoreError::Duplicate { .. } => Self::Unprocessable(err.to_string()),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self::Unprocessable(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            // Valid JSON of the wrong shape, e.g. a number where a string belongs
            JsonRejection::JsonDataError(e) => Self::Unprocessable(e.body_text()),
            other => Self::BadRequest(other.body_text()),
        }
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::NotFound(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_and_message_pairs() {
        let cases = [
            (ApiError::BadRequest(String::new()), 400, "bad request"),
            (ApiError::NotFound(String::new()), 404, "resource not found"),
            (ApiError::Unprocessable(String::new()), 422, "unprocessable"),
        ];
        for (err, status, message) in cases {
            assert_eq!(err.status().as_u16(), status);
            assert_eq!(err.message(), message);
        }
    }

    #[test]
    fn test_store_errors_map_to_status() {
        let not_found: ApiError = StoreError::NotFound { kind: "actor", id: 3 }.into();
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);

        let duplicate: ApiError = StoreError::Duplicate {
            kind: "movie",
            value: "Heat".into(),
        }
        .into();
        assert_eq!(duplicate.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
