//! Core domain types for the movie catalog.
//!
//! This module defines the records exchanged between the catalog services
//! and the aggregating movies service:
//! - `MovieInfo`: metadata owned by the movie-info service
//! - `Review`: a review owned by the review service
//! - `Movie`: the per-request aggregate of one `MovieInfo` and its reviews
//!
//! The JSON shape matches the services on the wire: camelCase keys, except
//! `release_date` which keeps its snake_case key.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

// =============================================================================
// Type Aliases
// =============================================================================

/// Identifier of a movie-info record (assigned by the store on creation)
pub type MovieInfoId = String;

/// Identifier of a review record (assigned by the store on creation)
pub type ReviewId = String;

// =============================================================================
// Records
// =============================================================================

/// Anything the record store can persist: it has an optional identifier
/// that the store assigns on first save.
pub trait Record: Clone + Send + Sync + 'static {
    /// Name used in logs and not-found messages
    const ENTITY: &'static str;

    fn id(&self) -> Option<&str>;

    fn set_id(&mut self, id: String);
}

/// Metadata for a single movie.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieInfo {
    /// `None` until the record has been saved
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub movie_info_id: Option<MovieInfoId>,

    /// Title of the movie
    #[serde(default)]
    pub name: String,

    /// Release year, must be positive
    #[serde(default)]
    pub year: i32,

    #[serde(default)]
    pub cast: Vec<String>,

    #[serde(rename = "release_date", default)]
    pub release_date: Option<NaiveDate>,
}

impl MovieInfo {
    /// Build an unsaved movie-info record
    pub fn new(
        name: impl Into<String>,
        year: i32,
        cast: Vec<String>,
        release_date: Option<NaiveDate>,
    ) -> Self {
        Self {
            movie_info_id: None,
            name: name.into(),
            year,
            cast,
            release_date,
        }
    }

    /// Same record with a fixed identifier (useful for seeding and tests)
    pub fn with_id(mut self, id: impl Into<MovieInfoId>) -> Self {
        self.movie_info_id = Some(id.into());
        self
    }
}

impl Record for MovieInfo {
    const ENTITY: &'static str = "MovieInfo";

    fn id(&self) -> Option<&str> {
        self.movie_info_id.as_deref()
    }

    fn set_id(&mut self, id: String) {
        self.movie_info_id = Some(id);
    }
}

/// A review left for a movie.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_id: Option<ReviewId>,

    /// Movie this review belongs to. Required, but kept optional here so that
    /// a missing value reaches validation instead of failing deserialization.
    #[serde(default, deserialize_with = "optional_id")]
    pub movie_info_id: Option<MovieInfoId>,

    #[serde(default)]
    pub comment: Option<String>,

    /// Must be >= 0 when present
    #[serde(default)]
    pub rating: Option<f64>,
}

impl Review {
    /// Build an unsaved review
    pub fn new(
        movie_info_id: impl Into<MovieInfoId>,
        comment: Option<String>,
        rating: Option<f64>,
    ) -> Self {
        Self {
            review_id: None,
            movie_info_id: Some(movie_info_id.into()),
            comment,
            rating,
        }
    }

    pub fn with_id(mut self, id: impl Into<ReviewId>) -> Self {
        self.review_id = Some(id.into());
        self
    }
}

impl Record for Review {
    const ENTITY: &'static str = "Review";

    fn id(&self) -> Option<&str> {
        self.review_id.as_deref()
    }

    fn set_id(&mut self, id: String) {
        self.review_id = Some(id);
    }
}

/// Movie identifiers show up both as strings and as bare numbers in review
/// payloads; accept either and normalise to a string.
fn optional_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(i64),
    }

    Ok(Option::<RawId>::deserialize(deserializer)?.map(|raw| match raw {
        RawId::Text(text) => text,
        RawId::Number(number) => number.to_string(),
    }))
}

// =============================================================================
// Aggregate
// =============================================================================

/// A movie together with all of its reviews.
///
/// Built fresh for every request and never persisted. The `movie_info`
/// field is not optional: a missing movie is reported as an error by the
/// aggregator, never as an empty aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Movie {
    pub movie_info: MovieInfo,
    pub review_list: Vec<Review>,
}

impl Movie {
    pub fn new(movie_info: MovieInfo, review_list: Vec<Review>) -> Self {
        Self {
            movie_info,
            review_list,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_movie_info_wire_format() {
        let info = MovieInfo::new(
            "Batman Begins",
            2005,
            vec!["Christian Bale".to_string(), "Michael Cane".to_string()],
            NaiveDate::from_ymd_opt(2005, 6, 15),
        )
        .with_id("abc");

        let value = serde_json::to_value(&info).unwrap();
        assert_eq!(
            value,
            json!({
                "movieInfoId": "abc",
                "name": "Batman Begins",
                "year": 2005,
                "cast": ["Christian Bale", "Michael Cane"],
                "release_date": "2005-06-15"
            })
        );
    }

    #[test]
    fn test_unsaved_movie_info_omits_id() {
        let info = MovieInfo::new("Dark Knight", 2008, vec!["Heath Ledger".into()], None);
        let value = serde_json::to_value(&info).unwrap();
        assert!(value.get("movieInfoId").is_none());
    }

    #[test]
    fn test_review_accepts_numeric_movie_id() {
        let review: Review =
            serde_json::from_value(json!({"movieInfoId": 1, "comment": "Awesome", "rating": 9.0}))
                .unwrap();
        assert_eq!(review.movie_info_id.as_deref(), Some("1"));
        assert_eq!(review.rating, Some(9.0));
        assert!(review.review_id.is_none());
    }

    #[test]
    fn test_review_missing_movie_id_still_parses() {
        let review: Review = serde_json::from_value(json!({"comment": "Awesome"})).unwrap();
        assert!(review.movie_info_id.is_none());
        assert!(review.rating.is_none());
    }

    #[test]
    fn test_movie_aggregate_wire_format() {
        let movie = Movie::new(
            MovieInfo::new("Batman Begins", 2005, vec!["Christian Bale".into()], None).with_id("abc"),
            vec![Review::new("abc", Some("Awesome".into()), Some(9.0)).with_id("r1")],
        );
        let value = serde_json::to_value(&movie).unwrap();
        assert_eq!(value["movieInfo"]["name"], "Batman Begins");
        assert_eq!(value["reviewList"][0]["reviewId"], "r1");
        assert_eq!(value["reviewList"][0]["movieInfoId"], "abc");
    }
}
