//! Authorization failures
//!
//! Every failure of the authorization layer is an [`AuthError`]: a stable
//! machine-readable [`AuthErrorCode`], a human-readable description and the
//! internal HTTP status class it belongs to. The gate collapses all of them
//! into a single outer [`Rejection`] before anything reaches the caller, so
//! the fine-grained codes only ever show up in logs.

use http::StatusCode;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Result type for the authorization layer
pub type AuthResult<T> = Result<T, AuthError>;

/// Machine-readable failure codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthErrorCode {
    /// No `Authorization` header on the request
    AuthorizationHeaderMissing,
    /// Malformed scheme or token, missing key id, unknown key, undecodable token
    InvalidHeader,
    /// Missing permissions claim, or audience/issuer mismatch
    InvalidClaims,
    /// Required permission not granted
    Unauthorized,
    /// Token past its expiry
    TokenExpired,
    /// The key set document could not be fetched or parsed
    KeySetUnavailable,
}

impl AuthErrorCode {
    /// Wire representation of the code
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AuthorizationHeaderMissing => "authorization_header_missing",
            Self::InvalidHeader => "invalid_header",
            Self::InvalidClaims => "invalid_claims",
            Self::Unauthorized => "unauthorized",
            Self::TokenExpired => "token_expired",
            Self::KeySetUnavailable => "key_set_unavailable",
        }
    }
}

impl fmt::Display for AuthErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failure raised by the fetcher, verifier or gate
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}: {description}")]
pub struct AuthError {
    code: AuthErrorCode,
    description: String,
    status: StatusCode,
}

impl AuthError {
    /// Create an error with an explicit status class
    pub fn new(code: AuthErrorCode, description: impl Into<String>, status: StatusCode) -> Self {
        Self {
            code,
            description: description.into(),
            status,
        }
    }

    pub(crate) fn header_missing() -> Self {
        Self::new(
            AuthErrorCode::AuthorizationHeaderMissing,
            "Authorization header is expected.",
            StatusCode::UNAUTHORIZED,
        )
    }

    /// `invalid_header` in the unauthorized class (header shape problems)
    pub(crate) fn invalid_header(description: impl Into<String>) -> Self {
        Self::new(
            AuthErrorCode::InvalidHeader,
            description,
            StatusCode::UNAUTHORIZED,
        )
    }

    /// `invalid_header` in the bad-request class (token parsing and key lookup)
    pub(crate) fn unparseable_token() -> Self {
        Self::new(
            AuthErrorCode::InvalidHeader,
            "Unable to parse authentication token.",
            StatusCode::BAD_REQUEST,
        )
    }

    pub(crate) fn key_not_found() -> Self {
        Self::new(
            AuthErrorCode::InvalidHeader,
            "Unable to find the appropriate key.",
            StatusCode::BAD_REQUEST,
        )
    }

    pub(crate) fn token_expired() -> Self {
        Self::new(
            AuthErrorCode::TokenExpired,
            "Token expired.",
            StatusCode::UNAUTHORIZED,
        )
    }

    pub(crate) fn incorrect_claims() -> Self {
        Self::new(
            AuthErrorCode::InvalidClaims,
            "Incorrect claims. Please, check the audience and issuer.",
            StatusCode::UNAUTHORIZED,
        )
    }

    pub(crate) fn permissions_missing() -> Self {
        Self::new(
            AuthErrorCode::InvalidClaims,
            "Permissions not included in JWT.",
            StatusCode::BAD_REQUEST,
        )
    }

    pub(crate) fn permission_not_found() -> Self {
        Self::new(
            AuthErrorCode::Unauthorized,
            "Permission not found.",
            StatusCode::UNAUTHORIZED,
        )
    }

    pub(crate) fn key_set_unavailable(description: impl Into<String>) -> Self {
        Self::new(
            AuthErrorCode::KeySetUnavailable,
            description,
            StatusCode::SERVICE_UNAVAILABLE,
        )
    }

    /// The failure code
    pub fn code(&self) -> AuthErrorCode {
        self.code
    }

    /// The human-readable description
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Internal status class, before the gate collapses it
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Structured body `{error: {code, description}, status_code}`
    pub fn body(&self) -> AuthErrorBody<'_> {
        AuthErrorBody {
            error: AuthErrorDetail {
                code: self.code,
                description: &self.description,
            },
            status_code: self.status.as_u16(),
        }
    }

    /// Collapse into the outer rejection seen by the caller
    pub fn into_rejection(self) -> Rejection {
        Rejection { cause: self }
    }
}

/// Serialized form of an [`AuthError`]
#[derive(Debug, Serialize)]
pub struct AuthErrorBody<'a> {
    /// Code and description
    pub error: AuthErrorDetail<'a>,
    /// Internal status class
    pub status_code: u16,
}

/// Code and description pair inside [`AuthErrorBody`]
#[derive(Debug, Serialize)]
pub struct AuthErrorDetail<'a> {
    /// Failure code
    pub code: AuthErrorCode,
    /// Human-readable description
    pub description: &'a str,
}

/// The outer, uniform rejection returned at the request boundary
///
/// Always maps to `401 Unauthorized`; the internal cause is retained for
/// logging and tests only.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unauthorized ({cause})")]
pub struct Rejection {
    cause: AuthError,
}

impl Rejection {
    /// Outer status, identical for every failure
    pub fn status(&self) -> StatusCode {
        StatusCode::UNAUTHORIZED
    }

    /// The internal failure that caused this rejection
    pub fn cause(&self) -> &AuthError {
        &self.cause
    }

    /// JSON body `{"success": false, "error": 401, "message": "unauthorized"}`
    pub fn json_body(&self) -> serde_json::Value {
        serde_json::json!({
            "success": false,
            "error": self.status().as_u16(),
            "message": "unauthorized",
        })
    }

    /// Render as an HTTP response with any body type buildable from a string
    pub fn into_http_response<B>(self) -> http::Response<B>
    where
        B: From<String>,
    {
        let mut response = http::Response::new(B::from(self.json_body().to_string()));
        *response.status_mut() = self.status();
        response.headers_mut().insert(
            http::header::CONTENT_TYPE,
            http::HeaderValue::from_static("application/json"),
        );
        response
    }
}

impl From<AuthError> for Rejection {
    fn from(err: AuthError) -> Self {
        err.into_rejection()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_wire_names() {
        assert_eq!(
            AuthErrorCode::AuthorizationHeaderMissing.as_str(),
            "authorization_header_missing"
        );
        assert_eq!(AuthErrorCode::InvalidHeader.to_string(), "invalid_header");
        assert_eq!(
            serde_json::to_value(AuthErrorCode::TokenExpired).unwrap(),
            "token_expired"
        );
    }

    #[test]
    fn test_body_shape() {
        let err = AuthError::permissions_missing();
        let body = serde_json::to_value(err.body()).unwrap();
        assert_eq!(body["error"]["code"], "invalid_claims");
        assert_eq!(body["error"]["description"], "Permissions not included in JWT.");
        assert_eq!(body["status_code"], 400);
    }

    #[test]
    fn test_rejection_collapses_status() {
        for err in [
            AuthError::unparseable_token(),
            AuthError::permissions_missing(),
            AuthError::key_set_unavailable("down"),
            AuthError::token_expired(),
        ] {
            let internal = err.status();
            let rejection = err.into_rejection();
            assert_eq!(rejection.status(), StatusCode::UNAUTHORIZED);
            assert_eq!(rejection.cause().status(), internal);
        }
    }

    #[test]
    fn test_rejection_http_response() {
        let response: http::Response<String> =
            AuthError::header_missing().into_rejection().into_http_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body: serde_json::Value = serde_json::from_str(response.body()).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], 401);
        assert_eq!(body["message"], "unauthorized");
    }
}
