//! `/v1/reviews` handlers.

use std::convert::Infallible;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use catalog::{CatalogError, Record, Review};
use futures::StreamExt;
use serde::Deserialize;

use super::ndjson;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub movie_info_id: Option<String>,
}

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Json<Vec<Review>> {
    Json(state.reviews.get_all(params.movie_info_id.as_deref()))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Review>, ApiError> {
    state
        .reviews
        .get_by_id(&id)
        .map(Json)
        .ok_or_else(|| CatalogError::not_found(Review::ENTITY, id).into())
}

pub async fn create(
    State(state): State<AppState>,
    Json(review): Json<Review>,
) -> Result<(StatusCode, Json<Review>), ApiError> {
    let saved = state.reviews.add(review)?;
    Ok((StatusCode::CREATED, Json(saved)))
}

/// Only the comment and rating of a review can change
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(review): Json<Review>,
) -> Result<Json<Review>, ApiError> {
    Ok(Json(state.reviews.update(&id, review)?))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.reviews.delete(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn stream(State(state): State<AppState>) -> Response {
    let records = state
        .reviews
        .subscribe()
        .into_stream()
        .map(|event| Ok::<_, Infallible>(event.record));
    ndjson(records)
}
