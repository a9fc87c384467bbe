//! Error types for the aggregation layer and their HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use catalog::CatalogError;
use thiserror::Error;
use tracing::warn;
use upstream_client::{FaultKind, UpstreamError};

/// Failure of one leg of `MovieAggregator::get_movie`.
///
/// The wrapped error is exactly what the failing upstream client returned,
/// so its kind, status and message survive the aggregation boundary.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AggregationError {
    #[error("{0}")]
    MovieInfo(UpstreamError),

    #[error("{0}")]
    Reviews(UpstreamError),
}

impl AggregationError {
    pub fn upstream(&self) -> &UpstreamError {
        match self {
            AggregationError::MovieInfo(err) | AggregationError::Reviews(err) => err,
        }
    }

    pub fn kind(&self) -> FaultKind {
        self.upstream().kind()
    }

    /// Which upstream failed ("movie-info" or "reviews")
    pub fn leg(&self) -> &'static str {
        match self {
            AggregationError::MovieInfo(_) => "movie-info",
            AggregationError::Reviews(_) => "reviews",
        }
    }
}

/// Everything a handler can fail with.
///
/// Rendered as a plain-text body carrying the original message.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Aggregation(#[from] AggregationError),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Catalog(CatalogError::Validation(_)) => StatusCode::BAD_REQUEST,
            ApiError::Catalog(CatalogError::NotFound { .. }) => StatusCode::NOT_FOUND,
            ApiError::Aggregation(err) => upstream_status(err.upstream()),
            ApiError::Upstream(err) => upstream_status(err),
        }
    }
}

/// The status to answer with when an upstream call failed.
///
/// Client and server faults keep the upstream's own status.
fn upstream_status(err: &UpstreamError) -> StatusCode {
    match err {
        UpstreamError::NotFound { .. } => StatusCode::NOT_FOUND,
        UpstreamError::Client { status, .. } | UpstreamError::Server { status, .. } => {
            StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
        }
        UpstreamError::Transport(_) => StatusCode::SERVICE_UNAVAILABLE,
        UpstreamError::Malformed(_) => StatusCode::BAD_GATEWAY,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!(%status, error = %self, "request failed");
        }
        (status, self.to_string()).into_response()
    }
}
