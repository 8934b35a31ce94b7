//! Logging initialization
//!
//! Logs always go to stderr. `RUST_LOG` takes precedence over the configured
//! level when set.

use std::io;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::{LogFormat, ServerConfig};

/// Install the global tracing subscriber
///
/// # Errors
///
/// Returns an error if the configured level is not a valid filter directive
/// or a global subscriber is already set.
pub fn init(config: &ServerConfig) -> io::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.log_level)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?,
    };

    let subscriber = tracing_subscriber::registry().with(filter);

    match config.log_format {
        LogFormat::Json => subscriber
            .with(fmt::layer().json().with_writer(io::stderr))
            .try_init()
            .map_err(|e| io::Error::other(e.to_string())),
        LogFormat::Pretty => subscriber
            .with(fmt::layer().with_target(true).with_writer(io::stderr))
            .try_init()
            .map_err(|e| io::Error::other(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_level_is_rejected() {
        // Only meaningful when RUST_LOG does not take over.
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let config = ServerConfig {
            log_level: "casting_server=verbose".to_string(),
            ..ServerConfig::default()
        };
        let err = init(&config).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }
}
