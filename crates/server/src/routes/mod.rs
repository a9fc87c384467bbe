//! HTTP routes.
//!
//! One router hosts the two catalogs and the aggregated movie view:
//!
//! | Route                     | Methods            |
//! |---------------------------|--------------------|
//! | `/v1/movieinfos`          | GET (`?year`), POST |
//! | `/v1/movieinfos/{id}`     | GET, PUT, DELETE   |
//! | `/v1/movieinfos/stream`   | GET (NDJSON)       |
//! | `/v1/reviews`             | GET (`?movieInfoId`), POST |
//! | `/v1/reviews/{id}`        | GET, PUT, DELETE   |
//! | `/v1/reviews/stream`      | GET (NDJSON)       |
//! | `/v1/movies/{id}`         | GET                |
//! | `/v1/movies/stream`       | GET (NDJSON)       |

pub mod movie_infos;
pub mod movies;
pub mod reviews;

use axum::body::Body;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{BoxError, Router};
use futures::{Stream, StreamExt};
use serde::Serialize;
use upstream_client::encode_line;

use crate::state::AppState;

pub const NDJSON: &str = "application/x-ndjson";

/// Build the application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/v1/movieinfos",
            get(movie_infos::list).post(movie_infos::create),
        )
        .route("/v1/movieinfos/stream", get(movie_infos::stream))
        .route(
            "/v1/movieinfos/{id}",
            get(movie_infos::get)
                .put(movie_infos::update)
                .delete(movie_infos::delete),
        )
        .route("/v1/reviews", get(reviews::list).post(reviews::create))
        .route("/v1/reviews/stream", get(reviews::stream))
        .route(
            "/v1/reviews/{id}",
            get(reviews::get).put(reviews::update).delete(reviews::delete),
        )
        .route("/v1/movies/stream", get(movies::stream))
        .route("/v1/movies/{id}", get(movies::get))
        .with_state(state)
}

/// Stream records as newline-delimited JSON.
///
/// An `Err` item aborts the response body, which the client sees as a
/// broken stream.
pub(crate) fn ndjson<S, T, E>(records: S) -> Response
where
    S: Stream<Item = Result<T, E>> + Send + 'static,
    T: Serialize,
    E: Into<BoxError>,
{
    let lines = records.map(|record| match record {
        Ok(record) => encode_line(&record).map_err(BoxError::from),
        Err(err) => Err(err.into()),
    });

    ([(header::CONTENT_TYPE, NDJSON)], Body::from_stream(lines)).into_response()
}
