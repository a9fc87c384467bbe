//! # Catalog Crate
//!
//! Domain records for the movie catalog and the services that own them.
//!
//! ## Main Components
//!
//! - **types**: Core domain types (MovieInfo, Review, Movie)
//! - **store**: The `RecordStore` capability and its in-memory implementation
//! - **rules**: Field validation as a chain of rules
//! - **service**: Movie-info and review services (validate, save, broadcast)
//! - **error**: Error types for the catalog
//!
//! ## Example Usage
//!
//! ```ignore
//! use catalog::{InMemoryStore, MovieInfo, MovieInfoService};
//! use hub::{BroadcastHub, HubConfig};
//! use std::sync::Arc;
//!
//! let service = MovieInfoService::new(
//!     Arc::new(InMemoryStore::new()),
//!     BroadcastHub::new(HubConfig::default()),
//! );
//!
//! let mut feed = service.subscribe();
//! let saved = service.add(MovieInfo::new("Batman Begins", 2005, vec!["Christian Bale".into()], None))?;
//! assert_eq!(feed.recv().await.unwrap().record, saved);
//! ```

pub mod error;
pub mod rules;
pub mod service;
pub mod store;
pub mod types;

// Re-export commonly used types for convenience
pub use error::{CatalogError, Result};
pub use rules::{ReservedId, Rule, Validator, RESERVED_ID};
pub use service::{MovieInfoService, ReviewService};
pub use store::{InMemoryStore, RecordStore};
pub use types::{
    // Type aliases
    MovieInfoId,
    ReviewId,
    // Core types
    Movie,
    MovieInfo,
    Record,
    Review,
};
