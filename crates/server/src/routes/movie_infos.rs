//! `/v1/movieinfos` handlers.

use std::convert::Infallible;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use catalog::{CatalogError, MovieInfo, Record};
use futures::StreamExt;
use serde::Deserialize;

use super::ndjson;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub year: Option<i32>,
}

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Json<Vec<MovieInfo>> {
    Json(state.movie_infos.get_all(params.year))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MovieInfo>, ApiError> {
    state
        .movie_infos
        .get_by_id(&id)
        .map(Json)
        .ok_or_else(|| CatalogError::not_found(MovieInfo::ENTITY, id).into())
}

pub async fn create(
    State(state): State<AppState>,
    Json(movie_info): Json<MovieInfo>,
) -> Result<(StatusCode, Json<MovieInfo>), ApiError> {
    let saved = state.movie_infos.add(movie_info)?;
    Ok((StatusCode::CREATED, Json(saved)))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(movie_info): Json<MovieInfo>,
) -> Result<Json<MovieInfo>, ApiError> {
    Ok(Json(state.movie_infos.update(&id, movie_info)?))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.movie_infos.delete(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Backlog, then every movie info created or updated from now on
pub async fn stream(State(state): State<AppState>) -> Response {
    let records = state
        .movie_infos
        .subscribe()
        .into_stream()
        .map(|event| Ok::<_, Infallible>(event.record));
    ndjson(records)
}
