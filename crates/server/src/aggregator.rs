//! # Movie Aggregator
//!
//! This module composes one `Movie` out of the two upstreams:
//! 1. Fetch the movie info and its reviews concurrently
//! 2. Stop early if the movie-info leg fails, otherwise wait for both legs
//! 3. Apply the failure rules
//! 4. Return the composite record
//!
//! ## Failure Rules
//!
//! - A movie-info fault always fails the aggregate, whatever the reviews leg did.
//! - A reviews `NotFound` means the movie has no reviews yet: empty list.
//! - Any other reviews fault fails the aggregate even though the movie info
//!   was found. Partial results are never returned.
//!
//! Both legs retry on their own. A failed movie-info leg decides the outcome,
//! so the reviews leg is dropped instead of running out its retries.
//! Dropping the future returned by `get_movie` drops both in-flight calls.

use std::time::Instant;

use catalog::{Movie, MovieInfo, Review};
use tracing::{debug, info, instrument};
use upstream_client::{
    MovieInfoClient, RecordStream, ReviewsClient, UpstreamConfig, UpstreamError,
};

use crate::error::AggregationError;

/// Read-side composition of the movie-info and reviews upstreams
#[derive(Debug, Clone)]
pub struct MovieAggregator {
    movie_info: MovieInfoClient,
    reviews: ReviewsClient,
}

impl MovieAggregator {
    pub fn new(movie_info: MovieInfoClient, reviews: ReviewsClient) -> Self {
        Self { movie_info, reviews }
    }

    /// Build both clients from their configs
    pub fn from_config(
        movie_info: UpstreamConfig,
        reviews: UpstreamConfig,
    ) -> Result<Self, UpstreamError> {
        Ok(Self::new(
            MovieInfoClient::new(movie_info)?,
            ReviewsClient::new(reviews)?,
        ))
    }

    pub fn movie_info_client(&self) -> &MovieInfoClient {
        &self.movie_info
    }

    pub fn reviews_client(&self) -> &ReviewsClient {
        &self.reviews
    }

    /// Fetch a movie and its reviews.
    ///
    /// Total latency is that of the slower leg, retries included, except that
    /// a movie-info failure returns as soon as it is known.
    #[instrument(skip(self))]
    pub async fn get_movie(&self, movie_id: &str) -> Result<Movie, AggregationError> {
        let start_time = Instant::now();

        let movie_info = self.movie_info.retrieve_movie_info(movie_id);
        let reviews = self.reviews.retrieve_reviews(movie_id);
        tokio::pin!(movie_info, reviews);

        let (movie_info, reviews) = tokio::select! {
            movie_info = &mut movie_info => match movie_info {
                Ok(movie_info) => (Ok(movie_info), reviews.await),
                Err(err) => {
                    debug!(%err, "movie-info leg failed, dropping reviews leg");
                    return Err(AggregationError::MovieInfo(err));
                }
            },
            reviews = &mut reviews => (movie_info.await, reviews),
        };

        let movie = combine(movie_info, reviews)?;
        info!(
            movie_id,
            reviews = movie.review_list.len(),
            elapsed = ?start_time.elapsed(),
            "aggregated movie"
        );
        Ok(movie)
    }

    /// Live feed of movie infos, straight from the movie-info upstream
    pub fn movie_info_stream(&self) -> RecordStream<MovieInfo> {
        self.movie_info.retrieve_movie_info_stream()
    }
}

/// Apply the failure rules to the outcome of both legs
fn combine(
    movie_info: Result<MovieInfo, UpstreamError>,
    reviews: Result<Vec<Review>, UpstreamError>,
) -> Result<Movie, AggregationError> {
    let movie_info = movie_info.map_err(AggregationError::MovieInfo)?;

    let reviews = match reviews {
        Ok(reviews) => reviews,
        Err(err) if err.is_not_found() => {
            debug!(%err, "no reviews for movie, using an empty list");
            Vec::new()
        }
        Err(err) => return Err(AggregationError::Reviews(err)),
    };

    Ok(Movie::new(movie_info, reviews))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use upstream_client::{FaultKind, RetryPolicy};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate, Times};

    // ============================================================================
    // Test Fixtures
    // ============================================================================

    fn batman() -> MovieInfo {
        MovieInfo::new("Batman Begins", 2005, vec!["Christian Bale".into()], None).with_id("abc")
    }

    fn reviews() -> Vec<Review> {
        vec![
            Review::new("abc", Some("Awesome Movie".into()), Some(9.0)).with_id("1"),
            Review::new("abc", Some("Excellent Movie".into()), Some(8.0)).with_id("2"),
        ]
    }

    /// An aggregator whose two upstreams live on one mock server
    fn aggregator_for(server: &MockServer) -> MovieAggregator {
        let retry = RetryPolicy::default().with_base_delay(Duration::from_millis(5));
        MovieAggregator::from_config(
            UpstreamConfig::new(format!("{}/v1/movieinfos", server.uri())).with_retry(retry.clone()),
            UpstreamConfig::new(format!("{}/v1/reviews", server.uri())).with_retry(retry),
        )
        .expect("valid upstream urls")
    }

    async fn mock_movie_info(
        server: &MockServer,
        template: ResponseTemplate,
        calls: impl Into<Times>,
    ) {
        Mock::given(method("GET"))
            .and(path("/v1/movieinfos/abc"))
            .respond_with(template)
            .expect(calls)
            .mount(server)
            .await;
    }

    async fn mock_reviews(
        server: &MockServer,
        template: ResponseTemplate,
        calls: impl Into<Times>,
    ) {
        Mock::given(method("GET"))
            .and(path("/v1/reviews"))
            .and(query_param("movieInfoId", "abc"))
            .respond_with(template)
            .expect(calls)
            .mount(server)
            .await;
    }

    // ============================================================================
    // Unit Tests: combine
    // ============================================================================

    #[test]
    fn test_combine_both_legs_succeed() {
        let movie = combine(Ok(batman()), Ok(reviews())).unwrap();
        assert_eq!(movie.movie_info, batman());
        assert_eq!(movie.review_list, reviews());
    }

    #[test]
    fn test_combine_movie_info_fault_wins() {
        let info_err = UpstreamError::from_status(404, "no such movie");
        let reviews_err = UpstreamError::from_status(500, "reviews down");

        let err = combine(Err(info_err.clone()), Err(reviews_err)).unwrap_err();
        assert_eq!(err, AggregationError::MovieInfo(info_err));
    }

    #[test]
    fn test_combine_reviews_not_found_is_empty() {
        let movie = combine(Ok(batman()), Err(UpstreamError::from_status(404, ""))).unwrap();
        assert!(movie.review_list.is_empty());
    }

    #[test]
    fn test_combine_reviews_client_fault_fails() {
        let reviews_err = UpstreamError::from_status(400, "bad movie id");
        let err = combine(Ok(batman()), Err(reviews_err.clone())).unwrap_err();
        assert_eq!(err, AggregationError::Reviews(reviews_err));
    }

    // ============================================================================
    // get_movie against mock upstreams
    // ============================================================================

    #[tokio::test]
    async fn test_get_movie() {
        let server = MockServer::start().await;
        mock_movie_info(&server, ResponseTemplate::new(200).set_body_json(batman()), 1).await;
        mock_reviews(&server, ResponseTemplate::new(200).set_body_json(reviews()), 1).await;

        let movie = aggregator_for(&server).get_movie("abc").await.unwrap();

        assert_eq!(movie.movie_info.name, "Batman Begins");
        assert_eq!(movie.review_list.len(), 2);
    }

    #[tokio::test]
    async fn test_get_movie_without_reviews() {
        let server = MockServer::start().await;
        mock_movie_info(&server, ResponseTemplate::new(200).set_body_json(batman()), 1).await;
        mock_reviews(&server, ResponseTemplate::new(404), 1).await;

        let movie = aggregator_for(&server).get_movie("abc").await.unwrap();

        assert!(movie.review_list.is_empty());
    }

    #[tokio::test]
    async fn test_get_movie_info_not_found() {
        let server = MockServer::start().await;
        mock_movie_info(&server, ResponseTemplate::new(404), 1).await;
        mock_reviews(&server, ResponseTemplate::new(200).set_body_json(reviews()), 0..=1).await;

        let err = aggregator_for(&server).get_movie("abc").await.unwrap_err();

        assert_eq!(err.leg(), "movie-info");
        assert_eq!(err.kind(), FaultKind::NotFound);
        assert_eq!(
            err.to_string(),
            "There is no MovieInfo available for the passed in Id : abc"
        );
    }

    #[tokio::test]
    async fn test_get_movie_info_server_error_retried() {
        let server = MockServer::start().await;
        mock_movie_info(
            &server,
            ResponseTemplate::new(500).set_body_string("MovieInfo Service Unavailable"),
            4,
        )
        .await;
        mock_reviews(&server, ResponseTemplate::new(200).set_body_json(reviews()), 0..=1).await;

        let err = aggregator_for(&server).get_movie("abc").await.unwrap_err();

        assert_eq!(err.kind(), FaultKind::Server);
        assert_eq!(err.to_string(), "MovieInfo Service Unavailable");
    }

    #[tokio::test]
    async fn test_get_movie_reviews_server_error_fails_aggregate() {
        let server = MockServer::start().await;
        mock_movie_info(&server, ResponseTemplate::new(200).set_body_json(batman()), 1).await;
        mock_reviews(
            &server,
            ResponseTemplate::new(500).set_body_string("Review Service Unavailable"),
            4,
        )
        .await;

        let err = aggregator_for(&server).get_movie("abc").await.unwrap_err();

        assert_eq!(err.leg(), "reviews");
        assert_eq!(err.upstream().status(), Some(500));
        assert_eq!(err.to_string(), "Review Service Unavailable");
    }

    #[tokio::test]
    async fn test_slow_leg_does_not_change_result() {
        let server = MockServer::start().await;
        mock_movie_info(
            &server,
            ResponseTemplate::new(200)
                .set_body_json(batman())
                .set_delay(Duration::from_millis(100)),
            1,
        )
        .await;
        mock_reviews(&server, ResponseTemplate::new(200).set_body_json(reviews()), 1).await;

        let movie = aggregator_for(&server).get_movie("abc").await.unwrap();

        assert_eq!(movie, Movie::new(batman(), reviews()));
    }

    #[tokio::test]
    async fn test_slow_reviews_leg_does_not_change_result() {
        let server = MockServer::start().await;
        mock_movie_info(&server, ResponseTemplate::new(200).set_body_json(batman()), 1).await;
        mock_reviews(
            &server,
            ResponseTemplate::new(200)
                .set_body_json(reviews())
                .set_delay(Duration::from_millis(100)),
            1,
        )
        .await;

        let movie = aggregator_for(&server).get_movie("abc").await.unwrap();

        assert_eq!(movie, Movie::new(batman(), reviews()));
    }

    #[tokio::test]
    async fn test_legs_run_concurrently() {
        let server = MockServer::start().await;
        let delay = Duration::from_millis(200);
        mock_movie_info(
            &server,
            ResponseTemplate::new(200).set_body_json(batman()).set_delay(delay),
            1,
        )
        .await;
        mock_reviews(
            &server,
            ResponseTemplate::new(200).set_body_json(reviews()).set_delay(delay),
            1,
        )
        .await;

        let start = Instant::now();
        let movie = aggregator_for(&server).get_movie("abc").await.unwrap();
        let elapsed = start.elapsed();

        assert_eq!(movie.review_list.len(), 2);
        assert!(elapsed >= delay, "finished before the slower leg: {elapsed:?}");
        // Sequential legs would take at least twice the delay
        assert!(elapsed < delay * 2, "legs ran one after the other: {elapsed:?}");
    }

    #[tokio::test]
    async fn test_movie_info_failure_does_not_wait_for_reviews() {
        let server = MockServer::start().await;
        mock_movie_info(&server, ResponseTemplate::new(404), 1).await;
        Mock::given(method("GET"))
            .and(path("/v1/reviews"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(reviews())
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let start = Instant::now();
        let err = aggregator_for(&server).get_movie("abc").await.unwrap_err();

        assert_eq!(err.kind(), FaultKind::NotFound);
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_movie_info_failure_wins_over_earlier_reviews_failure() {
        let server = MockServer::start().await;
        mock_movie_info(
            &server,
            ResponseTemplate::new(404).set_delay(Duration::from_millis(100)),
            1,
        )
        .await;
        mock_reviews(&server, ResponseTemplate::new(400).set_body_string("bad id"), 1).await;

        let err = aggregator_for(&server).get_movie("abc").await.unwrap_err();

        assert_eq!(err.leg(), "movie-info");
        assert_eq!(err.kind(), FaultKind::NotFound);
    }
}
