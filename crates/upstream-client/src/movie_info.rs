//! Client for the movie-info upstream.

use catalog::MovieInfo;
use reqwest::Url;
use tracing::instrument;

use crate::error::UpstreamError;
use crate::http::{HttpUpstream, RecordStream, UpstreamConfig};
use crate::retry::RetryPolicy;

/// Fetches movie metadata, retrying transient faults.
///
/// Cloning is cheap; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct MovieInfoClient {
    http: HttpUpstream,
}

impl MovieInfoClient {
    /// Create a client for the collection at `config.base_url`
    /// (e.g. `http://localhost:8080/v1/movieinfos`)
    pub fn new(config: UpstreamConfig) -> Result<Self, UpstreamError> {
        Ok(Self {
            http: HttpUpstream::new("movie-info", config)?,
        })
    }

    pub fn base_url(&self) -> &Url {
        self.http.base()
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        self.http.retry_policy()
    }

    /// Fetch one movie info by id.
    ///
    /// A 404 is reported as `NotFound` naming the id; every other fault keeps
    /// the upstream's status and body.
    #[instrument(skip(self))]
    pub async fn retrieve_movie_info(&self, movie_id: &str) -> Result<MovieInfo, UpstreamError> {
        self.http
            .get_json(self.http.endpoint(&[movie_id]), &[])
            .await
            .map_err(|err| match err {
                UpstreamError::NotFound { .. } => UpstreamError::NotFound {
                    message: format!(
                        "There is no MovieInfo available for the passed in Id : {movie_id}"
                    ),
                },
                other => other,
            })
    }

    /// Every movie info, optionally only those released in `year`
    #[instrument(skip(self))]
    pub async fn retrieve_all(&self, year: Option<i32>) -> Result<Vec<MovieInfo>, UpstreamError> {
        let year = year.map(|year| year.to_string());
        let query: Vec<(&str, &str)> = year.iter().map(|year| ("year", year.as_str())).collect();
        self.http.get_json(self.http.endpoint(&[]), &query).await
    }

    /// Live feed of created and updated movie infos
    pub fn retrieve_movie_info_stream(&self) -> RecordStream<MovieInfo> {
        self.http.stream_ndjson(self.http.endpoint(&["stream"]))
    }

    /// Create a movie info. Sent once, never retried.
    #[instrument(skip(self, movie_info), fields(name = %movie_info.name))]
    pub async fn add_movie_info(&self, movie_info: &MovieInfo) -> Result<MovieInfo, UpstreamError> {
        self.http.post_json(self.http.endpoint(&[]), movie_info).await
    }
}
