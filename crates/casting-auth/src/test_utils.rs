//! Test utilities for the authorization layer
//!
//! Fixture RSA keys, a token factory and in-memory key set sources, available
//! to this crate's tests and to downstream crates through the `test-utils`
//! feature. Nothing here is meant for production use.

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::config::AuthConfig;
use crate::error::{AuthError, AuthResult};
use crate::jwks::{Jwk, JwkSet, KeySetSource};

/// Domain used by [`test_config`]
pub const TEST_DOMAIN: &str = "casting.test.auth0.com";
/// Audience used by [`test_config`]
pub const TEST_AUDIENCE: &str = "casting-api";
/// Key id of the trusted fixture key
pub const TRUSTED_KID: &str = "casting-test-key";

/// Private half of the trusted key (PKCS#1 PEM)
pub const TRUSTED_RSA_PEM: &str = include_str!("../tests/fixtures/trusted_rsa.pem");
/// Private half of a key that is never published
pub const ROGUE_RSA_PEM: &str = include_str!("../tests/fixtures/rogue_rsa.pem");

/// Base64url modulus of the trusted key
pub const TRUSTED_RSA_N: &str = "x2DM7gwrDfZGs-qPzN7-1HcT4IdOujPkmPzRK0KEMDTJqA1h05aK5KgMrA9Jox1toWj8a01w4hqtq6ht7XEUzL1jvZ9kJAm6Om3T5iBSRUYjCpF0CV7-iodmpFJz_pH8XpbI2jPI2X77ABBXfPD-dig2zpp_jnj2hNQbnvFSOyZlWuUKi9l9zUIczNJAQFybbq8-HaHMgEjd2gWHkH46RVM84E1hWRwRlJG2t5tsPs_LKFFV-RX6WRM0kSgH-gE0RziVNA3ryPRViAMjF8vVVslnDNRpuJc7MXyUpw8kwUwcBEFIAjY-Wr3OyMvXidI52EuJZ_2W85C8HEPnzatZTQ";
/// Base64url public exponent shared by both fixture keys
pub const RSA_E: &str = "AQAB";

/// Seconds since the Unix epoch
pub fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// `RS256`-only configuration for [`TEST_DOMAIN`] and [`TEST_AUDIENCE`]
pub fn test_config() -> AuthConfig {
    AuthConfig::new(TEST_DOMAIN, &["RS256"], TEST_AUDIENCE)
        .expect("fixture configuration is valid")
}

/// Public record of the trusted key
pub fn trusted_jwk() -> Jwk {
    Jwk {
        kty: Some("RSA".to_string()),
        kid: Some(TRUSTED_KID.to_string()),
        key_use: Some("sig".to_string()),
        alg: Some("RS256".to_string()),
        n: Some(TRUSTED_RSA_N.to_string()),
        e: Some(RSA_E.to_string()),
        ..Jwk::default()
    }
}

/// Key set containing only the trusted key
pub fn trusted_key_set() -> JwkSet {
    JwkSet {
        keys: vec![trusted_jwk()],
    }
}

/// The trusted key set as a JSON document, as served at the well-known path
pub fn trusted_jwks_document() -> Value {
    json!({ "keys": [trusted_jwk()] })
}

/// Claims accepted by [`test_config`], valid for one hour
pub fn valid_claims(permissions: &[&str]) -> Value {
    let issued_at = now();
    json!({
        "iss": format!("https://{TEST_DOMAIN}/"),
        "sub": "auth0|casting-director",
        "aud": TEST_AUDIENCE,
        "iat": issued_at,
        "exp": issued_at + 3600,
        "permissions": permissions,
    })
}

/// Signs fixture tokens
pub struct TokenFactory {
    key: EncodingKey,
    algorithm: Algorithm,
    kid: Option<String>,
}

impl TokenFactory {
    /// Tokens signed by the published trusted key
    pub fn trusted() -> Self {
        Self::rsa(TRUSTED_RSA_PEM)
    }

    /// Tokens that claim the trusted key id but are signed by another key
    pub fn rogue() -> Self {
        Self::rsa(ROGUE_RSA_PEM)
    }

    /// HS256 tokens with an arbitrary secret
    pub fn hmac(secret: &[u8]) -> Self {
        Self {
            key: EncodingKey::from_secret(secret),
            algorithm: Algorithm::HS256,
            kid: Some(TRUSTED_KID.to_string()),
        }
    }

    fn rsa(pem: &str) -> Self {
        Self {
            key: EncodingKey::from_rsa_pem(pem.as_bytes()).expect("fixture PEM is valid"),
            algorithm: Algorithm::RS256,
            kid: Some(TRUSTED_KID.to_string()),
        }
    }

    /// Override the header key id
    #[must_use]
    pub fn with_kid(mut self, kid: &str) -> Self {
        self.kid = Some(kid.to_string());
        self
    }

    /// Omit the key id from the header
    #[must_use]
    pub fn without_kid(mut self) -> Self {
        self.kid = None;
        self
    }

    /// Override the signing algorithm (must fit the key)
    #[must_use]
    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Sign `claims` into a compact token
    pub fn sign(&self, claims: &Value) -> String {
        let mut header = Header::new(self.algorithm);
        header.kid.clone_from(&self.kid);
        encode(&header, claims, &self.key).expect("fixture token signs")
    }

    /// `Bearer <token>` header value for `claims`
    pub fn bearer(&self, claims: &Value) -> String {
        format!("Bearer {}", self.sign(claims))
    }
}

impl std::fmt::Debug for TokenFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenFactory")
            .field("algorithm", &self.algorithm)
            .field("kid", &self.kid)
            .finish_non_exhaustive()
    }
}

/// In-memory key set that counts how often it is read
#[derive(Debug)]
pub struct StaticKeySet {
    jwks: Arc<JwkSet>,
    fetches: AtomicUsize,
}

impl StaticKeySet {
    /// Serve `jwks` on every call
    pub fn new(jwks: JwkSet) -> Self {
        Self {
            jwks: Arc::new(jwks),
            fetches: AtomicUsize::new(0),
        }
    }

    /// Number of key set reads so far
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KeySetSource for StaticKeySet {
    async fn key_set(&self) -> AuthResult<Arc<JwkSet>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::clone(&self.jwks))
    }
}

/// Key set source whose endpoint is always down
#[derive(Debug, Default)]
pub struct UnavailableKeySet;

#[async_trait]
impl KeySetSource for UnavailableKeySet {
    async fn key_set(&self) -> AuthResult<Arc<JwkSet>> {
        Err(AuthError::key_set_unavailable(
            "key set endpoint returned status 503 Service Unavailable",
        ))
    }
}
