//! # Casting Auth - Bearer Token Authorization
//!
//! Authorization layer for the casting catalog API. Every protected operation
//! declares the permission it needs; the gate verifies the caller's bearer
//! token against the identity provider's published key set and checks the
//! token's `permissions` claim before the operation runs.
//!
//! ## Architecture
//!
//! - [`jwks`] - Key set fetcher (`https://{domain}/.well-known/jwks.json`)
//! - [`verifier`] - Token verifier (header, key lookup, signature, claims)
//! - [`gate`] - Authorization gate (header extraction, permission check)
//! - [`tower`] - Tower layer running the gate in front of HTTP services
//! - [`config`] - Domain, algorithm allow-list and audience
//! - [`error`] - Failure codes and the uniform outer rejection
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use casting_auth::{AuthConfig, AuthorizationGate};
//!
//! # tokio_test::block_on(async {
//! let config = AuthConfig::new("casting.eu.auth0.com", &["RS256"], "casting")?;
//! let gate = AuthorizationGate::from_config(config)?;
//!
//! match gate.authorize(Some("Bearer eyJ..."), "get:actors").await {
//!     Ok(claims) => println!("granted to {:?}", claims.subject()),
//!     Err(e) => println!("rejected: {e}"),
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! # });
//! ```
//!
//! ## Failure Model
//!
//! Internally every failure carries a code (`invalid_header`,
//! `token_expired`, ...) and a status class. At the request boundary they all
//! collapse into a single `401 Unauthorized` [`Rejection`].
//!
//! ## Feature Flags
//!
//! - `test-utils` - Fixture RSA keys, a token factory and in-memory key set
//!   sources for downstream tests

pub mod claims;
pub mod config;
pub mod error;
pub mod gate;
pub mod jwks;
pub mod tower;
pub mod verifier;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

#[doc(inline)]
pub use claims::{ClaimSet, PERMISSIONS_CLAIM};
#[doc(inline)]
pub use config::{AuthConfig, ConfigError};
#[doc(inline)]
pub use error::{AuthError, AuthErrorCode, AuthResult, Rejection};
#[doc(inline)]
pub use gate::{AuthorizationGate, Guarded, check_permissions, extract_bearer_token};
#[doc(inline)]
pub use jwks::{Jwk, JwkSet, JwksClient, KeySetError, KeySetSource};
#[doc(inline)]
pub use crate::tower::{PermissionLayer, PermissionService};
#[doc(inline)]
pub use verifier::TokenVerifier;
