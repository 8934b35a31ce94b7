//! Tower integration for the permission gate
//!
//! [`PermissionLayer`] wraps an HTTP service so every request is authorized
//! for one permission before it reaches the inner service:
//!
//! ```rust,ignore
//! use axum::{Router, routing::get};
//!
//! let app = Router::new().route(
//!     "/actors",
//!     get(list_actors).route_layer(gate.require("get:actors")),
//! );
//! ```
//!
//! Granted requests carry the verified [`ClaimSet`] in their extensions.
//! Rejected requests are answered with the uniform 401 body and the inner
//! service is never called.

use std::convert::Infallible;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::future::BoxFuture;
use tower::Layer;
use tower_service::Service;

use crate::claims::ClaimSet;
use crate::error::AuthError;
use crate::gate::AuthorizationGate;

/// Tower layer that requires a permission, created by
/// [`AuthorizationGate::require`]
#[derive(Debug, Clone)]
pub struct PermissionLayer {
    gate: Arc<AuthorizationGate>,
    permission: Arc<str>,
}

impl PermissionLayer {
    /// Layer enforcing `permission` through `gate`
    pub fn new(gate: Arc<AuthorizationGate>, permission: impl Into<Arc<str>>) -> Self {
        Self {
            gate,
            permission: permission.into(),
        }
    }

    /// The required permission
    pub fn permission(&self) -> &str {
        &self.permission
    }
}

impl<S> Layer<S> for PermissionLayer {
    type Service = PermissionService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        PermissionService {
            inner,
            gate: Arc::clone(&self.gate),
            permission: Arc::clone(&self.permission),
        }
    }
}

/// Service produced by [`PermissionLayer`]
#[derive(Debug, Clone)]
pub struct PermissionService<S> {
    inner: S,
    gate: Arc<AuthorizationGate>,
    permission: Arc<str>,
}

impl<S> PermissionService<S> {
    /// Get a reference to the inner service
    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S, B, ResBody> Service<http::Request<B>> for PermissionService<S>
where
    S: Service<http::Request<B>, Response = http::Response<ResBody>, Error = Infallible>
        + Clone
        + Send
        + 'static,
    S::Future: Send,
    B: Send + 'static,
    ResBody: From<String>,
{
    type Response = http::Response<ResBody>;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: http::Request<B>) -> Self::Future {
        let gate = Arc::clone(&self.gate);
        let permission = Arc::clone(&self.permission);
        // Drive the instance that was polled ready; leave a fresh clone behind.
        let inner = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, inner);

        Box::pin(async move {
            let header = authorization_header(req.headers());

            match gate.authorize(header.as_deref(), &permission).await {
                Ok(claims) => {
                    req.extensions_mut().insert::<ClaimSet>(claims);
                    inner.call(req).await
                }
                Err(e) => Ok(AuthError::into_rejection(e).into_http_response()),
            }
        })
    }
}

/// The `Authorization` value as text
///
/// Non-ASCII bytes are replaced rather than dropping the header, so such a
/// value fails as a malformed token and not as a missing header.
fn authorization_header(headers: &http::HeaderMap) -> Option<String> {
    headers
        .get(http::header::AUTHORIZATION)
        .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
}
