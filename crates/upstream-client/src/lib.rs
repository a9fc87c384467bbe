//! HTTP clients for the movie-info and reviews upstreams.
//!
//! This crate provides the resilient side of the aggregator. It handles:
//! - Classifying every failed call (`UpstreamError`, `FaultKind`)
//! - Bounded retry with fixed or exponential backoff (`RetryPolicy`)
//! - Single-record and collection fetches
//! - NDJSON streams that re-establish themselves on transient faults
//!
//! ## Example Usage
//!
//! ```ignore
//! use upstream_client::{MovieInfoClient, RetryPolicy, UpstreamConfig};
//!
//! let client = MovieInfoClient::new(
//!     UpstreamConfig::new("http://localhost:8080/v1/movieinfos")
//!         .with_retry(RetryPolicy::default().with_max_retries(2)),
//! )?;
//!
//! match client.retrieve_movie_info("abc").await {
//!     Ok(info) => println!("{}", info.name),
//!     Err(err) if err.is_not_found() => println!("{err}"),
//!     Err(err) => return Err(err.into()),
//! }
//! ```

pub mod error;
pub mod http;
pub mod movie_info;
pub mod ndjson;
pub mod retry;
pub mod reviews;

pub use error::{FaultKind, UpstreamError};
pub use http::{RecordStream, UpstreamConfig};
pub use movie_info::MovieInfoClient;
pub use ndjson::{encode_line, LineDecoder};
pub use retry::{with_retry, Backoff, Decision, RetryPolicy, RetryState, StopReason};
pub use reviews::ReviewsClient;
