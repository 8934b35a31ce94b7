//! JWKS (JSON Web Key Set) fetching
//!
//! The key set is read from `https://{domain}/.well-known/jwks.json`, where
//! `domain` comes from [`AuthConfig`] and never from request data.
//!
//! - **No cache by default**: every verification re-fetches the document
//! - **Optional TTL cache**: an atomically swapped snapshot, invalidated on
//!   fetch failure and force-refreshed (rate limited) on a key-id miss
//! - **Tolerant parsing**: records that fail to parse are skipped
//!
//! Fetch and parse failures surface as `key_set_unavailable`, which is a
//! different failure class from an invalid token.

use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::AuthConfig;
use crate::error::{AuthError, AuthResult};

/// Minimum spacing between forced refreshes
const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(5);

/// Key set fetch error
#[derive(Debug, Error)]
pub enum KeySetError {
    /// HTTP request to the key set endpoint failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The endpoint answered with a non-success status
    #[error("key set endpoint returned status {0}")]
    Status(reqwest::StatusCode),

    /// Plain HTTP is only allowed for loopback hosts
    #[error("key set endpoint must use HTTPS: {0}")]
    InsecureUri(String),

    /// The document is not a JSON object with a `keys` array
    #[error("invalid key set document: {0}")]
    InvalidDocument(String),
}

impl From<KeySetError> for AuthError {
    fn from(err: KeySetError) -> Self {
        AuthError::key_set_unavailable(err.to_string())
    }
}

/// JSON Web Key record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    /// Key Type (RSA, EC, OKP)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kty: Option<String>,

    /// Key ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,

    /// Public Key Use (sig, enc)
    #[serde(default, rename = "use", skip_serializing_if = "Option::is_none")]
    pub key_use: Option<String>,

    /// Algorithm hint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,

    /// RSA modulus (base64url)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,

    /// RSA exponent (base64url)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,

    /// Curve name (P-256, P-384, Ed25519)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crv: Option<String>,

    /// EC/OKP X coordinate (base64url)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,

    /// EC Y coordinate (base64url)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,
}

impl Jwk {
    /// Whether this record may verify a token signed with `algorithm`
    ///
    /// The key type must match the algorithm family and the declared use must
    /// be absent or `sig`. A declared curve or `alg` must match the token
    /// algorithm.
    pub fn is_usable_for(&self, algorithm: Algorithm) -> bool {
        let Some(expected_kty) = key_type_for(algorithm) else {
            return false;
        };
        if self.kty.as_deref() != Some(expected_kty) {
            return false;
        }
        if let Some(key_use) = self.key_use.as_deref()
            && key_use != "sig"
        {
            return false;
        }
        if let (Some(crv), Some(expected_crv)) = (self.crv.as_deref(), curve_for(algorithm))
            && crv != expected_crv
        {
            return false;
        }
        match self.alg.as_deref() {
            Some(alg) => alg.parse::<Algorithm>().ok() == Some(algorithm),
            None => true,
        }
    }

    /// Convert into a `jsonwebtoken` decoding key
    ///
    /// # Errors
    ///
    /// Returns `invalid_header` when the key parameters are missing or malformed.
    pub fn to_decoding_key(&self) -> AuthResult<DecodingKey> {
        let key = match self.kty.as_deref() {
            Some("RSA") => match (&self.n, &self.e) {
                (Some(n), Some(e)) => DecodingKey::from_rsa_components(n, e).ok(),
                _ => None,
            },
            Some("EC") => match (&self.x, &self.y) {
                (Some(x), Some(y)) => DecodingKey::from_ec_components(x, y).ok(),
                _ => None,
            },
            Some("OKP") => self
                .x
                .as_deref()
                .and_then(|x| DecodingKey::from_ed_components(x).ok()),
            _ => None,
        };

        key.ok_or_else(|| {
            warn!(kid = ?self.kid, kty = ?self.kty, "Key set record has unusable parameters");
            AuthError::unparseable_token()
        })
    }
}

/// Key type required for an algorithm family
fn key_type_for(algorithm: Algorithm) -> Option<&'static str> {
    match algorithm {
        Algorithm::RS256
        | Algorithm::RS384
        | Algorithm::RS512
        | Algorithm::PS256
        | Algorithm::PS384
        | Algorithm::PS512 => Some("RSA"),
        Algorithm::ES256 | Algorithm::ES384 => Some("EC"),
        Algorithm::EdDSA => Some("OKP"),
        _ => None,
    }
}

/// Curve required for an EC or OKP algorithm
fn curve_for(algorithm: Algorithm) -> Option<&'static str> {
    match algorithm {
        Algorithm::ES256 => Some("P-256"),
        Algorithm::ES384 => Some("P-384"),
        Algorithm::EdDSA => Some("Ed25519"),
        _ => None,
    }
}

/// An ordered collection of key records
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JwkSet {
    /// Key records in document order
    pub keys: Vec<Jwk>,
}

impl JwkSet {
    /// Parse a key set document
    ///
    /// A document without a `keys` array yields an empty set. Records that
    /// are not objects of string fields are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`KeySetError::InvalidDocument`] if the body is not a JSON object.
    pub fn from_document(document: serde_json::Value) -> Result<Self, KeySetError> {
        let serde_json::Value::Object(mut fields) = document else {
            return Err(KeySetError::InvalidDocument(
                "expected a JSON object".to_string(),
            ));
        };

        let records = match fields.remove("keys") {
            Some(serde_json::Value::Array(records)) => records,
            _ => Vec::new(),
        };

        let keys = records
            .into_iter()
            .filter_map(|record| match serde_json::from_value::<Jwk>(record) {
                Ok(jwk) => Some(jwk),
                Err(e) => {
                    warn!(error = %e, "Skipping malformed key set record");
                    None
                }
            })
            .collect();

        Ok(Self { keys })
    }

    /// Find a record with the given key id usable for `algorithm`
    pub fn find(&self, kid: &str, algorithm: Algorithm) -> Option<&Jwk> {
        self.keys
            .iter()
            .find(|jwk| jwk.kid.as_deref() == Some(kid) && jwk.is_usable_for(algorithm))
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Source of the trusted key set
///
/// Implemented by [`JwksClient`] for the remote document; the `test-utils`
/// feature provides in-memory sources.
#[async_trait]
pub trait KeySetSource: Send + Sync + std::fmt::Debug {
    /// Current key set (cached or freshly fetched)
    async fn key_set(&self) -> AuthResult<Arc<JwkSet>>;

    /// Re-fetch after a key-id miss; only meaningful for caching sources
    async fn refresh(&self) -> AuthResult<Arc<JwkSet>> {
        self.key_set().await
    }

    /// Whether [`KeySetSource::key_set`] may serve a stale copy
    fn is_caching(&self) -> bool {
        false
    }
}

/// Cached key set with metadata
#[derive(Debug)]
struct CachedJwks {
    jwks: Arc<JwkSet>,
    cached_at: Instant,
}

impl CachedJwks {
    fn is_valid(&self, ttl: Duration) -> bool {
        self.cached_at.elapsed() < ttl
    }
}

/// HTTP client for the key set document
///
/// # Example
///
/// ```rust
/// use casting_auth::{AuthConfig, JwksClient};
///
/// let config = AuthConfig::new("casting.eu.auth0.com", &["RS256"], "casting")?;
/// let client = JwksClient::from_config(&config)?;
/// assert_eq!(client.jwks_uri(), "https://casting.eu.auth0.com/.well-known/jwks.json");
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct JwksClient {
    jwks_uri: String,
    http_client: reqwest::Client,
    /// `None` fetches on every call
    cache_ttl: Option<Duration>,
    cache: ArcSwapOption<CachedJwks>,
    last_refresh: Mutex<Option<Instant>>,
}

impl JwksClient {
    /// Create a client for the configured domain
    ///
    /// # Errors
    ///
    /// Returns [`KeySetError::Http`] if the HTTP client cannot be built.
    pub fn from_config(config: &AuthConfig) -> Result<Self, KeySetError> {
        Self::with_jwks_uri(config.jwks_uri(), config.fetch_timeout, config.cache_ttl)
    }

    /// Create a client for an explicit key set location
    ///
    /// # Errors
    ///
    /// Returns [`KeySetError::InsecureUri`] for non-HTTPS URIs outside
    /// loopback, or [`KeySetError::Http`] if the HTTP client cannot be built.
    pub fn with_jwks_uri(
        jwks_uri: impl Into<String>,
        timeout: Duration,
        cache_ttl: Option<Duration>,
    ) -> Result<Self, KeySetError> {
        let jwks_uri = jwks_uri.into();
        if !is_secure_uri(&jwks_uri) {
            return Err(KeySetError::InsecureUri(jwks_uri));
        }

        let http_client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            jwks_uri,
            http_client,
            cache_ttl,
            cache: ArcSwapOption::empty(),
            last_refresh: Mutex::new(None),
        })
    }

    /// The key set endpoint URI
    pub fn jwks_uri(&self) -> &str {
        &self.jwks_uri
    }

    /// Drop any cached key set
    pub fn clear_cache(&self) {
        self.cache.store(None);
        debug!(jwks_uri = %self.jwks_uri, "JWKS cache cleared");
    }

    async fn fetch(&self) -> Result<JwkSet, KeySetError> {
        info!(jwks_uri = %self.jwks_uri, "Fetching JWKS from endpoint");

        let response = self.http_client.get(&self.jwks_uri).send().await?;

        if !response.status().is_success() {
            return Err(KeySetError::Status(response.status()));
        }

        let document: serde_json::Value = response
            .json()
            .await
            .map_err(|e| KeySetError::InvalidDocument(e.to_string()))?;
        let jwks = JwkSet::from_document(document)?;

        info!(
            jwks_uri = %self.jwks_uri,
            key_count = jwks.len(),
            "Fetched JWKS"
        );
        Ok(jwks)
    }

    async fn fetch_and_cache(&self) -> AuthResult<Arc<JwkSet>> {
        *self.last_refresh.lock() = Some(Instant::now());

        match self.fetch().await {
            Ok(jwks) => {
                let jwks = Arc::new(jwks);
                if self.cache_ttl.is_some() {
                    self.cache.store(Some(Arc::new(CachedJwks {
                        jwks: Arc::clone(&jwks),
                        cached_at: Instant::now(),
                    })));
                }
                Ok(jwks)
            }
            Err(e) => {
                error!(jwks_uri = %self.jwks_uri, error = %e, "Failed to fetch JWKS");
                self.cache.store(None);
                Err(e.into())
            }
        }
    }
}

#[async_trait]
impl KeySetSource for JwksClient {
    async fn key_set(&self) -> AuthResult<Arc<JwkSet>> {
        if let Some(ttl) = self.cache_ttl
            && let Some(cached) = self.cache.load_full()
            && cached.is_valid(ttl)
        {
            debug!(jwks_uri = %self.jwks_uri, "Using cached JWKS");
            return Ok(Arc::clone(&cached.jwks));
        }

        self.fetch_and_cache().await
    }

    async fn refresh(&self) -> AuthResult<Arc<JwkSet>> {
        let last_refresh = *self.last_refresh.lock();
        if last_refresh.is_some_and(|last| last.elapsed() < MIN_REFRESH_INTERVAL) {
            warn!(jwks_uri = %self.jwks_uri, "JWKS refresh rate limited, using cache");
            return self.key_set().await;
        }

        self.fetch_and_cache().await
    }

    fn is_caching(&self) -> bool {
        self.cache_ttl.is_some()
    }
}

fn is_secure_uri(uri: &str) -> bool {
    let Ok(url) = reqwest::Url::parse(uri) else {
        return false;
    };
    match (url.scheme(), url.host_str()) {
        ("https", Some(_)) => true,
        ("http", Some("localhost")) => true,
        ("http", Some(host)) => host
            .trim_start_matches('[')
            .trim_end_matches(']')
            .parse::<IpAddr>()
            .is_ok_and(|ip| ip.is_loopback()),
        _ => false,
    }
}
