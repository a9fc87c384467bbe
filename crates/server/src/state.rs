//! Shared application state handed to every handler.

use std::sync::Arc;

use catalog::{InMemoryStore, MovieInfoService, ReviewService};
use hub::BroadcastHub;
use tracing::info;
use upstream_client::UpstreamError;

use crate::aggregator::MovieAggregator;
use crate::config::ServerConfig;

/// Services behind the router. Cloning shares the underlying stores and hubs.
#[derive(Clone)]
pub struct AppState {
    pub movie_infos: MovieInfoService,
    pub reviews: ReviewService,
    pub aggregator: MovieAggregator,
}

impl AppState {
    pub fn new(
        movie_infos: MovieInfoService,
        reviews: ReviewService,
        aggregator: MovieAggregator,
    ) -> Self {
        Self {
            movie_infos,
            reviews,
            aggregator,
        }
    }

    /// In-memory catalogs with hubs and upstream clients built from `config`
    pub fn from_config(config: &ServerConfig) -> Result<Self, UpstreamError> {
        let hub_config = config.feed.hub_config();
        let movie_infos =
            MovieInfoService::new(Arc::new(InMemoryStore::new()), BroadcastHub::new(hub_config));
        let reviews =
            ReviewService::new(Arc::new(InMemoryStore::new()), BroadcastHub::new(hub_config));
        let aggregator =
            MovieAggregator::from_config(config.movie_info_upstream(), config.reviews_upstream())?;

        Ok(Self::new(movie_infos, reviews, aggregator))
    }

    /// End every live feed so that open stream responses complete
    pub fn close_feeds(&self) {
        self.movie_infos.hub().close();
        self.reviews.hub().close();
        info!("live feeds closed");
    }
}
