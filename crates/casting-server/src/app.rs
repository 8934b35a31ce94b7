//! Application assembly

use axum::Router;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use casting_auth::AuthorizationGate;

use crate::api;
use crate::store::CastingStore;

/// Shared handler state
#[derive(Debug, Clone)]
pub struct AppState {
    /// Catalog storage
    pub store: Arc<dyn CastingStore>,
}

impl AppState {
    /// State backed by `store`
    pub fn new(store: Arc<dyn CastingStore>) -> Self {
        Self { store }
    }
}

/// Build the complete router: catalog routes, request tracing and CORS
pub fn build_app(state: AppState, gate: &AuthorizationGate) -> Router {
    let middleware = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    api::routes(gate).layer(middleware).with_state(state)
}
