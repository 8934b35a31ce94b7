//! `/movies` handlers

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::{Extension, Json};
use casting_auth::ClaimSet;
use serde_json::{Value, json};
use tracing::info;

use super::error::{ApiError, ApiResult};
use crate::app::AppState;
use crate::model::MoviePayload;

/// `GET /movies`; an empty catalog is reported as not found
pub async fn list(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let movies = state.store.list_movies();
    if movies.is_empty() {
        return Err(ApiError::NotFound("no movies".to_string()));
    }
    Ok(Json(json!({ "success": true, "movies": movies })))
}

/// `POST /movies`
pub async fn create(
    State(state): State<AppState>,
    Extension(claims): Extension<ClaimSet>,
    payload: Result<Json<MoviePayload>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(payload) = payload?;
    let movie = state.store.create_movie(payload.into_new()?)?;
    info!(movie_id = movie.movie_id, subject = ?claims.subject(), "Movie added to catalog");
    Ok(Json(json!({ "success": true, "movie": movie })))
}

/// `PATCH /movies/{id}`
pub async fn update(
    State(state): State<AppState>,
    Extension(claims): Extension<ClaimSet>,
    id: Result<Path<u64>, PathRejection>,
    payload: Result<Json<MoviePayload>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Path(id) = id?;
    if state.store.get_movie(id).is_none() {
        return Err(ApiError::NotFound(format!("movie {id} not found")));
    }
    let Json(payload) = payload?;
    let movie = state.store.update_movie(id, payload.into_changes()?)?;
    info!(movie_id = id, subject = ?claims.subject(), "Movie modified");
    Ok(Json(json!({ "success": true, "movie": movie })))
}

/// `DELETE /movies/{id}`
pub async fn delete(
    State(state): State<AppState>,
    Extension(claims): Extension<ClaimSet>,
    id: Result<Path<u64>, PathRejection>,
) -> ApiResult<Json<Value>> {
    let Path(id) = id?;
    state.store.delete_movie(id)?;
    info!(movie_id = id, subject = ?claims.subject(), "Movie removed from catalog");
    Ok(Json(json!({ "success": true, "delete": id })))
}
