//! Server crate for the movies service.
//!
//! This crate wires the catalogs, their live feeds and the aggregator into
//! one axum application.
//!
//! ## Main Components
//!
//! - **aggregator**: Concurrent fetch of movie info and reviews, combined into a `Movie`
//! - **routes**: HTTP handlers, including the NDJSON live feeds
//! - **state**: Services shared by all handlers
//! - **config**: `clap` configuration (flags and environment)
//! - **error**: Aggregation errors and their HTTP mapping

pub mod aggregator;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;

pub use aggregator::MovieAggregator;
pub use config::{RetryArgs, ServerConfig};
pub use error::{AggregationError, ApiError};
pub use routes::router;
pub use state::AppState;
