//! `/actors` handlers

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::{Extension, Json};
use casting_auth::ClaimSet;
use serde_json::{Value, json};
use tracing::info;

use super::error::{ApiError, ApiResult};
use crate::app::AppState;
use crate::model::ActorPayload;

/// `GET /actors`; an empty catalog is reported as not found
pub async fn list(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let actors = state.store.list_actors();
    if actors.is_empty() {
        return Err(ApiError::NotFound("no actors".to_string()));
    }
    Ok(Json(json!({ "success": true, "actors": actors })))
}

/// `POST /actors`
pub async fn create(
    State(state): State<AppState>,
    Extension(claims): Extension<ClaimSet>,
    payload: Result<Json<ActorPayload>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(payload) = payload?;
    let actor = state.store.create_actor(payload.into_new()?)?;
    info!(actor_id = actor.actor_id, subject = ?claims.subject(), "Actor added to catalog");
    Ok(Json(json!({ "success": true, "actor": actor })))
}

/// `PATCH /actors/{id}`; unknown ids are not found before the body is read
pub async fn update(
    State(state): State<AppState>,
    Extension(claims): Extension<ClaimSet>,
    id: Result<Path<u64>, PathRejection>,
    payload: Result<Json<ActorPayload>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Path(id) = id?;
    if state.store.get_actor(id).is_none() {
        return Err(ApiError::NotFound(format!("actor {id} not found")));
    }
    let Json(payload) = payload?;
    let actor = state.store.update_actor(id, payload.into_changes()?)?;
    info!(actor_id = id, subject = ?claims.subject(), "Actor modified");
    Ok(Json(json!({ "success": true, "actor": actor })))
}

/// `DELETE /actors/{id}`
pub async fn delete(
    State(state): State<AppState>,
    Extension(claims): Extension<ClaimSet>,
    id: Result<Path<u64>, PathRejection>,
) -> ApiResult<Json<Value>> {
    let Path(id) = id?;
    state.store.delete_actor(id)?;
    info!(actor_id = id, subject = ?claims.subject(), "Actor removed from catalog");
    Ok(Json(json!({ "success": true, "delete": id })))
}
