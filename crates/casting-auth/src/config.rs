//! Authorization configuration
//!
//! Three values are required at process start: the trusted authentication
//! domain, the signing algorithm allow-list and the expected audience. They are
//! read once, validated, and handed to the verifier as an immutable
//! [`AuthConfig`]. Missing or invalid values are startup errors, never
//! per-request ones.

use jsonwebtoken::Algorithm;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Environment variable holding the trusted authentication domain
pub const DOMAIN_VAR: &str = "AUTH0_DOMAIN";
/// Environment variable holding the comma-separated algorithm allow-list
pub const ALGORITHMS_VAR: &str = "ALGORITHMS";
/// Environment variable holding the expected audience
pub const AUDIENCE_VAR: &str = "API_AUDIENCE";
/// Optional key set cache TTL in seconds (unset or 0 disables caching)
pub const CACHE_TTL_VAR: &str = "JWKS_CACHE_TTL_SECS";
/// Optional clock skew leeway in seconds
pub const LEEWAY_VAR: &str = "JWT_LEEWAY_SECS";
/// Optional key set fetch timeout in seconds
pub const FETCH_TIMEOUT_VAR: &str = "JWKS_FETCH_TIMEOUT_SECS";

const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration errors, all fatal at startup
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A required variable is absent or empty
    #[error("missing required configuration value {0}")]
    Missing(&'static str),

    /// The domain is not a bare host name
    #[error("invalid authentication domain {0:?}: expected a bare host such as tenant.auth0.com")]
    InvalidDomain(String),

    /// An algorithm name is unknown or not permitted
    #[error("invalid signing algorithm {0:?}: only asymmetric algorithms (RS*, PS*, ES*, EdDSA) are accepted")]
    InvalidAlgorithm(String),

    /// A numeric value failed to parse
    #[error("invalid value {value:?} for {name}")]
    InvalidNumber {
        /// Variable name
        name: &'static str,
        /// Offending value
        value: String,
    },
}

/// Immutable authorization settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthConfig {
    domain: String,
    algorithms: Vec<Algorithm>,
    audience: String,
    /// Key set cache TTL; `None` re-fetches on every verification
    pub cache_ttl: Option<Duration>,
    /// Clock skew tolerance applied to `exp`/`nbf`, in seconds
    pub leeway: u64,
    /// Timeout for a single key set fetch
    pub fetch_timeout: Duration,
}

impl AuthConfig {
    /// Build a configuration from explicit values
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the domain is not a bare host, the
    /// audience is empty, or the algorithm list is empty or names a symmetric
    /// or unknown algorithm.
    pub fn new(
        domain: impl Into<String>,
        algorithms: &[&str],
        audience: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let domain = domain.into().trim().to_string();
        validate_domain(&domain)?;

        let audience = audience.into().trim().to_string();
        if audience.is_empty() {
            return Err(ConfigError::Missing(AUDIENCE_VAR));
        }

        let algorithms = algorithms
            .iter()
            .map(|name| parse_algorithm(name))
            .collect::<Result<Vec<_>, _>>()?;
        if algorithms.is_empty() {
            return Err(ConfigError::Missing(ALGORITHMS_VAR));
        }

        Ok(Self {
            domain,
            algorithms,
            audience,
            cache_ttl: None,
            leeway: 0,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        })
    }

    /// Load from the process environment
    ///
    /// # Errors
    ///
    /// See [`AuthConfig::from_lookup`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load through an arbitrary variable lookup
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] for an absent required variable and
    /// the validation errors of [`AuthConfig::new`] otherwise.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(name))
        };

        let domain = required(DOMAIN_VAR)?;
        let algorithms = required(ALGORITHMS_VAR)?;
        let audience = required(AUDIENCE_VAR)?;

        let names: Vec<&str> = algorithms
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();
        let mut config = Self::new(domain, &names, audience)?;

        let seconds = |name: &'static str| -> Result<Option<u64>, ConfigError> {
            match lookup(name) {
                Some(value) if !value.trim().is_empty() => value
                    .trim()
                    .parse::<u64>()
                    .map(Some)
                    .map_err(|_| ConfigError::InvalidNumber { name, value }),
                _ => Ok(None),
            }
        };

        config.cache_ttl = seconds(CACHE_TTL_VAR)?
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);
        config.leeway = seconds(LEEWAY_VAR)?.unwrap_or(0);
        if let Some(secs) = seconds(FETCH_TIMEOUT_VAR)? {
            config.fetch_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    /// Enable the key set cache
    #[must_use]
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    /// Set the clock skew leeway
    #[must_use]
    pub fn with_leeway(mut self, leeway: u64) -> Self {
        self.leeway = leeway;
        self
    }

    /// Trusted authentication domain
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Algorithm allow-list
    pub fn algorithms(&self) -> &[Algorithm] {
        &self.algorithms
    }

    /// Expected `aud` claim
    pub fn audience(&self) -> &str {
        &self.audience
    }

    /// Expected `iss` claim: `https://{domain}/`
    pub fn issuer(&self) -> String {
        format!("https://{}/", self.domain)
    }

    /// Key set location: `https://{domain}/.well-known/jwks.json`
    pub fn jwks_uri(&self) -> String {
        format!("https://{}/.well-known/jwks.json", self.domain)
    }
}

fn validate_domain(domain: &str) -> Result<(), ConfigError> {
    if domain.is_empty() {
        return Err(ConfigError::Missing(DOMAIN_VAR));
    }
    let bare = domain
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | ':'));
    if !bare || domain.starts_with('.') || domain.ends_with('.') {
        return Err(ConfigError::InvalidDomain(domain.to_string()));
    }
    Ok(())
}

fn parse_algorithm(name: &str) -> Result<Algorithm, ConfigError> {
    let invalid = || ConfigError::InvalidAlgorithm(name.to_string());
    let algorithm = Algorithm::from_str(name.trim()).map_err(|_| invalid())?;
    match algorithm {
        // Symmetric algorithms cannot be verified with a published key set
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => Err(invalid()),
        _ => Ok(algorithm),
    }
}
