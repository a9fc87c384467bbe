//! Client for the reviews upstream.

use catalog::Review;
use reqwest::Url;
use tracing::instrument;

use crate::error::UpstreamError;
use crate::http::{HttpUpstream, RecordStream, UpstreamConfig};
use crate::retry::RetryPolicy;

/// Fetches reviews, retrying transient faults
#[derive(Debug, Clone)]
pub struct ReviewsClient {
    http: HttpUpstream,
}

impl ReviewsClient {
    /// Create a client for the collection at `config.base_url`
    /// (e.g. `http://localhost:8080/v1/reviews`)
    pub fn new(config: UpstreamConfig) -> Result<Self, UpstreamError> {
        Ok(Self {
            http: HttpUpstream::new("reviews", config)?,
        })
    }

    pub fn base_url(&self) -> &Url {
        self.http.base()
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        self.http.retry_policy()
    }

    /// Reviews of one movie (`GET {base}?movieInfoId={id}`).
    ///
    /// A 404 is passed through as `NotFound`; whether that means "no reviews"
    /// is up to the caller.
    #[instrument(skip(self))]
    pub async fn retrieve_reviews(&self, movie_id: &str) -> Result<Vec<Review>, UpstreamError> {
        self.http
            .get_json(self.http.endpoint(&[]), &[("movieInfoId", movie_id)])
            .await
    }

    /// Live feed of created and updated reviews
    pub fn retrieve_review_stream(&self) -> RecordStream<Review> {
        self.http.stream_ndjson(self.http.endpoint(&["stream"]))
    }

    /// Create a review. Sent once, never retried.
    #[instrument(skip(self, review), fields(movie_info_id = ?review.movie_info_id))]
    pub async fn add_review(&self, review: &Review) -> Result<Review, UpstreamError> {
        self.http.post_json(self.http.endpoint(&[]), review).await
    }
}
