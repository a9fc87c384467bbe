//! Catalog services: the write path for movie-info and review records.
//!
//! Each service validates incoming records, persists them through a
//! `RecordStore`, and publishes every created or updated record to its
//! `BroadcastHub` so that stream subscribers see it.
//!
//! Update and delete are not-found aware: an unknown identifier is reported
//! as `CatalogError::NotFound` rather than silently succeeding.

use std::sync::Arc;

use hub::{BroadcastHub, HubError, Subscription};
use tracing::{info, instrument, warn};

use crate::error::{CatalogError, Result};
use crate::rules::{movie_info_validator, review_validator, Validator};
use crate::store::RecordStore;
use crate::types::{MovieInfo, Record, Review};

/// Publish a freshly written record; a closed hub only happens during
/// shutdown and must not fail the write that already happened.
fn announce<R: Record>(hub: &BroadcastHub<R>, record: &R) {
    match hub.publish(record.clone()) {
        Ok(seq) => info!(entity = R::ENTITY, id = ?record.id(), seq, "published record"),
        Err(HubError::Closed) => {
            warn!(entity = R::ENTITY, id = ?record.id(), "hub closed, record not broadcast")
        }
    }
}

// =============================================================================
// MovieInfoService
// =============================================================================

/// Owns movie-info records and their live feed
#[derive(Clone)]
pub struct MovieInfoService {
    store: Arc<dyn RecordStore<MovieInfo>>,
    hub: BroadcastHub<MovieInfo>,
    validator: Arc<Validator<MovieInfo>>,
}

impl MovieInfoService {
    pub fn new(store: Arc<dyn RecordStore<MovieInfo>>, hub: BroadcastHub<MovieInfo>) -> Self {
        Self {
            store,
            hub,
            validator: Arc::new(movie_info_validator()),
        }
    }

    /// All movie infos, optionally only those released in `year`
    pub fn get_all(&self, year: Option<i32>) -> Vec<MovieInfo> {
        match year {
            Some(year) => self.store.find_where(&|info| info.year == year),
            None => self.store.find_all(),
        }
    }

    pub fn get_by_id(&self, id: &str) -> Option<MovieInfo> {
        self.store.find_by_id(id)
    }

    /// Validate, save and broadcast a new movie info
    #[instrument(skip(self, movie_info), fields(name = %movie_info.name))]
    pub fn add(&self, movie_info: MovieInfo) -> Result<MovieInfo> {
        self.validator.validate(&movie_info)?;
        let saved = self.store.save(movie_info);
        announce(&self.hub, &saved);
        Ok(saved)
    }

    /// Replace the fields of an existing movie info. The identifier in
    /// `update` is ignored.
    #[instrument(skip(self, update))]
    pub fn update(&self, id: &str, update: MovieInfo) -> Result<MovieInfo> {
        let saved = self.store.update_with(id, &mut |mut existing| {
            existing.name = update.name.clone();
            existing.year = update.year;
            existing.cast = update.cast.clone();
            existing.release_date = update.release_date;
            self.validator.validate(&existing)?;
            Ok(existing)
        })?;
        announce(&self.hub, &saved);
        Ok(saved)
    }

    #[instrument(skip(self))]
    pub fn delete(&self, id: &str) -> Result<()> {
        if self.store.delete(id) {
            Ok(())
        } else {
            Err(CatalogError::not_found(MovieInfo::ENTITY, id))
        }
    }

    /// Attach to the live feed of created/updated movie infos
    pub fn subscribe(&self) -> Subscription<MovieInfo> {
        self.hub.subscribe()
    }

    pub fn hub(&self) -> &BroadcastHub<MovieInfo> {
        &self.hub
    }
}

// =============================================================================
// ReviewService
// =============================================================================

/// Owns review records and their live feed
#[derive(Clone)]
pub struct ReviewService {
    store: Arc<dyn RecordStore<Review>>,
    hub: BroadcastHub<Review>,
    validator: Arc<Validator<Review>>,
}

impl ReviewService {
    pub fn new(store: Arc<dyn RecordStore<Review>>, hub: BroadcastHub<Review>) -> Self {
        Self {
            store,
            hub,
            validator: Arc::new(review_validator()),
        }
    }

    /// All reviews, optionally only those for one movie
    pub fn get_all(&self, movie_info_id: Option<&str>) -> Vec<Review> {
        match movie_info_id {
            Some(movie_info_id) => self
                .store
                .find_where(&|review| review.movie_info_id.as_deref() == Some(movie_info_id)),
            None => self.store.find_all(),
        }
    }

    pub fn get_by_id(&self, id: &str) -> Option<Review> {
        self.store.find_by_id(id)
    }

    /// Validate, save and broadcast a new review
    #[instrument(skip(self, review), fields(movie_info_id = ?review.movie_info_id))]
    pub fn add(&self, review: Review) -> Result<Review> {
        self.validator.validate(&review)?;
        let saved = self.store.save(review);
        announce(&self.hub, &saved);
        Ok(saved)
    }

    /// Update the comment and rating of an existing review.
    ///
    /// The movie a review belongs to never changes.
    #[instrument(skip(self, update))]
    pub fn update(&self, id: &str, update: Review) -> Result<Review> {
        let saved = self.store.update_with(id, &mut |mut existing| {
            existing.comment = update.comment.clone();
            existing.rating = update.rating;
            self.validator.validate(&existing)?;
            Ok(existing)
        })?;
        announce(&self.hub, &saved);
        Ok(saved)
    }

    #[instrument(skip(self))]
    pub fn delete(&self, id: &str) -> Result<()> {
        if self.store.delete(id) {
            Ok(())
        } else {
            Err(CatalogError::not_found(Review::ENTITY, id))
        }
    }

    /// Attach to the live feed of created/updated reviews
    pub fn subscribe(&self) -> Subscription<Review> {
        self.hub.subscribe()
    }

    pub fn hub(&self) -> &BroadcastHub<Review> {
        &self.hub
    }
}
