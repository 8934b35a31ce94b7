//! Permission gate for protected operations
//!
//! [`AuthorizationGate`] takes the raw `Authorization` header of a request and
//! the permission an operation requires, and either yields the verified
//! [`ClaimSet`] or fails. Failures keep their fine-grained code for logging;
//! callers at the request boundary only ever see a uniform [`Rejection`].

use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::claims::ClaimSet;
use crate::config::AuthConfig;
use crate::error::{AuthError, AuthResult, Rejection};
use crate::jwks::KeySetError;
use crate::tower::PermissionLayer;
use crate::verifier::TokenVerifier;

/// Pull the bearer token out of an `Authorization` header value
///
/// # Errors
///
/// - `authorization_header_missing` when the header is absent or blank
/// - `invalid_header` when the scheme is not `Bearer` (case-insensitive), the
///   token is missing, or there are trailing parts
pub fn extract_bearer_token(header: Option<&str>) -> AuthResult<&str> {
    let header = header.unwrap_or_default();
    let mut parts = header.split_whitespace();

    let Some(scheme) = parts.next() else {
        return Err(AuthError::header_missing());
    };
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::invalid_header(
            "Authorization header must start with \"Bearer\".",
        ));
    }

    let Some(token) = parts.next() else {
        return Err(AuthError::invalid_header("Token not found."));
    };
    if parts.next().is_some() {
        return Err(AuthError::invalid_header(
            "Authorization header must be bearer token.",
        ));
    }

    Ok(token)
}

/// Check that `claims` grant `permission`
///
/// # Errors
///
/// - `invalid_claims` (400) when there is no permissions claim at all
/// - `unauthorized` (401) when the permission is not granted
pub fn check_permissions(permission: &str, claims: &ClaimSet) -> AuthResult<()> {
    if !claims.has_permissions_claim() {
        return Err(AuthError::permissions_missing());
    }
    if !claims.has_permission(permission) {
        return Err(AuthError::permission_not_found());
    }
    Ok(())
}

/// Runs extraction, verification and the permission check in order
///
/// Cloning is cheap; clones share the verifier and its key set source.
///
/// # Example
///
/// ```rust,no_run
/// # use casting_auth::{AuthConfig, AuthorizationGate, ClaimSet};
/// # tokio_test::block_on(async {
/// let gate = AuthorizationGate::from_config(AuthConfig::from_env()?)?;
///
/// let list_actors = gate.guard("get:actors", |claims: ClaimSet, page: u32| async move {
///     format!("page {page} for {:?}", claims.subject())
/// });
/// let body = list_actors.call(Some("Bearer eyJ..."), 1).await?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct AuthorizationGate {
    verifier: TokenVerifier,
}

impl AuthorizationGate {
    /// Gate backed by an existing verifier
    pub fn new(verifier: TokenVerifier) -> Self {
        Self { verifier }
    }

    /// Gate that fetches keys from the configured domain
    ///
    /// # Errors
    ///
    /// Returns [`KeySetError`] if the key set HTTP client cannot be built.
    pub fn from_config(config: AuthConfig) -> Result<Self, KeySetError> {
        Ok(Self::new(TokenVerifier::from_config(config)?))
    }

    /// The underlying verifier
    pub fn verifier(&self) -> &TokenVerifier {
        &self.verifier
    }

    /// Authorize a request for `permission`
    ///
    /// Every failure is logged with its code, description and internal
    /// status before being returned.
    ///
    /// # Errors
    ///
    /// Returns the first [`AuthError`] raised by token extraction,
    /// verification or the permission check.
    pub async fn authorize(&self, header: Option<&str>, permission: &str) -> AuthResult<ClaimSet> {
        let outcome = self.run(header, permission).await;
        match &outcome {
            Ok(claims) => debug!(
                permission = permission,
                subject = ?claims.subject(),
                "Request authorized"
            ),
            Err(e) => warn!(
                permission = permission,
                code = %e.code(),
                description = e.description(),
                status = e.status().as_u16(),
                "Request rejected"
            ),
        }
        outcome
    }

    async fn run(&self, header: Option<&str>, permission: &str) -> AuthResult<ClaimSet> {
        let token = extract_bearer_token(header)?;
        let claims = self.verifier.verify(token).await?;
        check_permissions(permission, &claims)?;
        Ok(claims)
    }

    /// Wrap `handler` so it only runs once `permission` is granted
    ///
    /// The handler receives the verified claim set first, followed by the
    /// caller's arguments.
    pub fn guard<F>(&self, permission: impl Into<String>, handler: F) -> Guarded<F> {
        Guarded {
            gate: self.clone(),
            permission: permission.into(),
            handler,
        }
    }

    /// Tower layer enforcing `permission` on HTTP services
    pub fn require(&self, permission: impl Into<Arc<str>>) -> PermissionLayer {
        PermissionLayer::new(Arc::new(self.clone()), permission)
    }
}

/// A handler behind a permission check, created by [`AuthorizationGate::guard`]
#[derive(Debug, Clone)]
pub struct Guarded<F> {
    gate: AuthorizationGate,
    permission: String,
    handler: F,
}

impl<F> Guarded<F> {
    /// The permission this handler requires
    pub fn permission(&self) -> &str {
        &self.permission
    }

    /// Authorize, then invoke the handler exactly once with the claim set
    ///
    /// # Errors
    ///
    /// Returns a [`Rejection`] without invoking the handler when
    /// authorization fails.
    pub async fn call<A, Fut, T>(&self, header: Option<&str>, args: A) -> Result<T, Rejection>
    where
        F: Fn(ClaimSet, A) -> Fut,
        Fut: Future<Output = T>,
    {
        let claims = self
            .gate
            .authorize(header, &self.permission)
            .await
            .map_err(AuthError::into_rejection)?;
        Ok((self.handler)(claims, args).await)
    }
}
