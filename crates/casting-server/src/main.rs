//! casting-server entry point

use anyhow::Context;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use casting_auth::{AuthConfig, AuthorizationGate};
use casting_server::{AppState, MemoryStore, ServerConfig, build_app, logging};

/// Casting catalog REST service
///
/// Authorization settings come from `AUTH0_DOMAIN`, `ALGORITHMS` and
/// `API_AUDIENCE`.
#[derive(Parser, Debug)]
#[command(name = "casting-server", version, about)]
struct Cli {
    /// Configuration file (TOML, YAML or JSON)
    #[arg(short, long, env = "CASTING_CONFIG")]
    config: Option<PathBuf>,

    /// Listen address, overriding the configuration
    #[arg(short, long)]
    bind: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config =
        ServerConfig::load(cli.config.as_deref()).context("failed to load server configuration")?;
    if let Some(bind) = cli.bind {
        config.bind_addr = bind;
    }
    logging::init(&config).context("failed to initialize logging")?;

    let auth_config = AuthConfig::from_env().context("invalid authorization configuration")?;
    info!(
        domain = auth_config.domain(),
        audience = auth_config.audience(),
        algorithms = ?auth_config.algorithms(),
        cache_ttl = ?auth_config.cache_ttl,
        "Authorization configured"
    );
    let gate = AuthorizationGate::from_config(auth_config)
        .context("failed to build key set client")?;

    let state = AppState::new(Arc::new(MemoryStore::new()));
    let app = build_app(state, &gate);

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    info!(addr = %config.bind_addr, "Casting server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Casting server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
