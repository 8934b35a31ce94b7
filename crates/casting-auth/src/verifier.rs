//! Bearer token verification
//!
//! [`TokenVerifier`] runs a single token through a short state machine that
//! stops at the first failure:
//!
//! 1. decode the unverified header and require a key id (`kid`)
//! 2. check the header algorithm against the configured allow-list
//! 3. find a usable key with that id in the trusted key set
//! 4. verify the signature, `aud`, `iss` and `exp`
//!
//! The algorithm set is never taken from the token itself: a token naming an
//! algorithm outside the allow-list is rejected before any key is fetched.

use jsonwebtoken::errors::{Error as JwtError, ErrorKind};
use jsonwebtoken::{Algorithm, Validation, decode, decode_header};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::claims::ClaimSet;
use crate::config::AuthConfig;
use crate::error::{AuthError, AuthResult};
use crate::jwks::{Jwk, JwksClient, KeySetError, KeySetSource};

/// Registered claims every accepted token must carry
const REQUIRED_CLAIMS: [&str; 3] = ["exp", "aud", "iss"];

/// Verifies bearer tokens against the trusted key set
///
/// # Example
///
/// ```rust,no_run
/// # use casting_auth::{AuthConfig, TokenVerifier};
/// # tokio_test::block_on(async {
/// let config = AuthConfig::new("casting.eu.auth0.com", &["RS256"], "casting")?;
/// let verifier = TokenVerifier::from_config(config)?;
///
/// let claims = verifier.verify("eyJ0eXAiOiJKV1QiLCJhbGc...").await?;
/// println!("permissions: {:?}", claims.permissions());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct TokenVerifier {
    config: Arc<AuthConfig>,
    issuer: String,
    key_source: Arc<dyn KeySetSource>,
}

impl TokenVerifier {
    /// Create a verifier reading keys from an arbitrary source
    pub fn new(config: AuthConfig, key_source: Arc<dyn KeySetSource>) -> Self {
        let issuer = config.issuer();
        Self {
            config: Arc::new(config),
            issuer,
            key_source,
        }
    }

    /// Create a verifier that fetches `https://{domain}/.well-known/jwks.json`
    ///
    /// # Errors
    ///
    /// Returns [`KeySetError`] if the HTTP client cannot be built.
    pub fn from_config(config: AuthConfig) -> Result<Self, KeySetError> {
        let client = JwksClient::from_config(&config)?;
        Ok(Self::new(config, Arc::new(client)))
    }

    /// The configuration this verifier enforces
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Expected issuer, `https://{domain}/`
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Verify a token and return its claims unchanged
    ///
    /// # Errors
    ///
    /// - `invalid_header` (401) when the header has no key id
    /// - `invalid_header` (400) for undecodable tokens, algorithms outside the
    ///   allow-list, unknown keys and bad signatures
    /// - `token_expired` (401) past `exp`
    /// - `invalid_claims` (401) for audience or issuer mismatches and missing
    ///   registered claims
    /// - `key_set_unavailable` when the key set cannot be fetched
    pub async fn verify(&self, token: &str) -> AuthResult<ClaimSet> {
        let header = decode_header(token).map_err(|e| {
            debug!(error = %e, "Failed to decode JWT header");
            AuthError::unparseable_token()
        })?;

        let Some(kid) = header.kid.as_deref() else {
            warn!("JWT missing kid (key ID) in header");
            return Err(AuthError::invalid_header("Authorization malformed."));
        };

        if !self.config.algorithms().contains(&header.alg) {
            warn!(
                algorithm = ?header.alg,
                allowed = ?self.config.algorithms(),
                "JWT algorithm not allowed"
            );
            return Err(AuthError::unparseable_token());
        }

        let jwk = self.find_key(kid, header.alg).await?;
        let decoding_key = jwk.to_decoding_key()?;

        let mut validation = Validation::new(header.alg);
        validation.set_audience(&[self.config.audience()]);
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.set_required_spec_claims(&REQUIRED_CLAIMS);
        validation.validate_nbf = true;
        validation.leeway = self.config.leeway;

        let token_data = decode::<ClaimSet>(token, &decoding_key, &validation).map_err(|e| {
            warn!(
                error = %e,
                kid = kid,
                issuer = %self.issuer,
                audience = %self.config.audience(),
                "JWT validation failed"
            );
            classify(&e)
        })?;

        debug!(
            kid = kid,
            subject = ?token_data.claims.subject(),
            algorithm = ?header.alg,
            "JWT validation successful"
        );
        Ok(token_data.claims)
    }

    /// Look up the signing key, refreshing a cached key set once on a miss
    async fn find_key(&self, kid: &str, algorithm: Algorithm) -> AuthResult<Jwk> {
        let jwks = self.key_source.key_set().await?;
        if let Some(jwk) = jwks.find(kid, algorithm) {
            return Ok(jwk.clone());
        }

        if self.key_source.is_caching() {
            debug!(kid = kid, "Key ID not in cached JWKS, refreshing");
            let jwks = self.key_source.refresh().await?;
            if let Some(jwk) = jwks.find(kid, algorithm) {
                return Ok(jwk.clone());
            }
        }

        warn!(kid = kid, algorithm = ?algorithm, "Key ID not found in JWKS");
        Err(AuthError::key_not_found())
    }
}

/// Map a `jsonwebtoken` failure onto the verifier's error taxonomy
fn classify(err: &JwtError) -> AuthError {
    match err.kind() {
        ErrorKind::ExpiredSignature => AuthError::token_expired(),
        ErrorKind::InvalidAudience
        | ErrorKind::InvalidIssuer
        | ErrorKind::ImmatureSignature
        | ErrorKind::MissingRequiredClaim(_) => AuthError::incorrect_claims(),
        _ => AuthError::unparseable_token(),
    }
}
