//! `/v1/movies` handlers: the aggregated view over both upstreams.

use axum::Json;
use axum::extract::{Path, State};
use axum::response::Response;
use catalog::Movie;

use super::ndjson;
use crate::error::ApiError;
use crate::state::AppState;

/// A movie info with all of its reviews, or the failing upstream's status and message
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Movie>, ApiError> {
    Ok(Json(state.aggregator.get_movie(&id).await?))
}

/// Movie infos relayed from the movie-info upstream's live feed
pub async fn stream(State(state): State<AppState>) -> Response {
    ndjson(state.aggregator.movie_info_stream())
}
