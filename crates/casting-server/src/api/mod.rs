//! HTTP API
//!
//! | Method | Path | Permission |
//! |---|---|---|
//! | GET | `/actors` | `get:actors` |
//! | POST | `/actors` | `post:actors` |
//! | PATCH | `/actors/{id}` | `patch:actors` |
//! | DELETE | `/actors/{id}` | `delete:actors` |
//! | GET | `/movies` | `get:movies` |
//! | POST | `/movies` | `post:movies` |
//! | PATCH | `/movies/{id}` | `patch:movies` |
//! | DELETE | `/movies/{id}` | `delete:movies` |
//!
//! Each handler sits behind its own permission layer, so authorization runs
//! before any path or body extraction.

pub mod actors;
pub mod error;
pub mod movies;

use axum::Router;
use axum::handler::Handler;
use axum::routing::{get, patch};
use casting_auth::AuthorizationGate;

use crate::app::AppState;
pub use error::{ApiError, ApiResult};

/// Catalog routes, each guarded by its permission
pub fn routes(gate: &AuthorizationGate) -> Router<AppState> {
    Router::new()
        .route(
            "/actors",
            get(actors::list.layer(gate.require("get:actors")))
                .post(actors::create.layer(gate.require("post:actors"))),
        )
        .route(
            "/actors/{id}",
            patch(actors::update.layer(gate.require("patch:actors")))
                .delete(actors::delete.layer(gate.require("delete:actors"))),
        )
        .route(
            "/movies",
            get(movies::list.layer(gate.require("get:movies")))
                .post(movies::create.layer(gate.require("post:movies"))),
        )
        .route(
            "/movies/{id}",
            patch(movies::update.layer(gate.require("patch:movies")))
                .delete(movies::delete.layer(gate.require("delete:movies"))),
        )
        .fallback(not_found)
}

async fn not_found() -> ApiError {
    ApiError::NotFound("no such route".to_string())
}
