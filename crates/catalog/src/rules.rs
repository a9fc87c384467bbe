//! Field validation for incoming records.
//!
//! Each check is a small `Rule` and a `Validator` chains rules together
//! using the builder pattern. All rules run (validation does not stop at
//! the first failure) and the messages of the failing ones are sorted and
//! joined into a single error.
//!
//! ## Usage
//! ```ignore
//! let validator = Validator::new(",")
//!     .add_rule(NameRequired)
//!     .add_rule(PositiveYear);
//!
//! validator.validate(&movie_info)?;
//! ```

use tracing::debug;

use crate::error::{CatalogError, Result};
use crate::types::{MovieInfo, Record, Review};

/// Path segment the HTTP surface uses for the live feed of a collection.
/// A record stored under this id could never be addressed.
pub const RESERVED_ID: &str = "stream";

/// A single field check.
///
/// `Send + Sync` allows a validator to be shared by concurrent request handlers.
pub trait Rule<T>: Send + Sync {
    /// Returns the name of this rule (for logging/debugging)
    fn name(&self) -> &str;

    /// Returns the violation message, or `None` if the record passes
    fn check(&self, record: &T) -> Option<String>;
}

/// Chains multiple rules into one validation step.
pub struct Validator<T> {
    rules: Vec<Box<dyn Rule<T>>>,
    separator: &'static str,
}

impl<T> Validator<T> {
    /// Create a validator whose combined message joins violations with `separator`
    pub fn new(separator: &'static str) -> Self {
        Self {
            rules: Vec::new(),
            separator,
        }
    }

    /// Add a rule to the validator (builder pattern)
    pub fn add_rule(mut self, rule: impl Rule<T> + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Run every rule against `record`.
    ///
    /// # Returns
    /// * `Ok(())` - All rules passed
    /// * `Err(CatalogError::Validation)` - Sorted, joined messages of the failing rules
    pub fn validate(&self, record: &T) -> Result<()> {
        let mut violations: Vec<String> = self
            .rules
            .iter()
            .filter_map(|rule| {
                let violation = rule.check(record);
                if let Some(message) = &violation {
                    debug!(rule = rule.name(), %message, "validation rule failed");
                }
                violation
            })
            .collect();

        if violations.is_empty() {
            return Ok(());
        }

        violations.sort();
        Err(CatalogError::Validation(violations.join(self.separator)))
    }
}

/// A caller-supplied identifier must not collide with a collection route
pub struct ReservedId {
    field: &'static str,
}

impl ReservedId {
    pub fn new(field: &'static str) -> Self {
        Self { field }
    }
}

impl<R: Record> Rule<R> for ReservedId {
    fn name(&self) -> &str {
        "ReservedId"
    }

    fn check(&self, record: &R) -> Option<String> {
        (record.id() == Some(RESERVED_ID))
            .then(|| format!("{} : {RESERVED_ID} is a reserved identifier", self.field))
    }
}

// =============================================================================
// MovieInfo rules
// =============================================================================

/// The title must not be blank
pub struct NameRequired;

impl Rule<MovieInfo> for NameRequired {
    fn name(&self) -> &str {
        "NameRequired"
    }

    fn check(&self, record: &MovieInfo) -> Option<String> {
        record
            .name
            .trim()
            .is_empty()
            .then(|| "movieInfo.name must be present".to_string())
    }
}

/// The release year must be a positive number
pub struct PositiveYear;

impl Rule<MovieInfo> for PositiveYear {
    fn name(&self) -> &str {
        "PositiveYear"
    }

    fn check(&self, record: &MovieInfo) -> Option<String> {
        (record.year <= 0).then(|| "movieInfo.year must be a Positive Value".to_string())
    }
}

/// The cast list must be non-empty and every entry non-blank
pub struct CastPresent;

impl Rule<MovieInfo> for CastPresent {
    fn name(&self) -> &str {
        "CastPresent"
    }

    fn check(&self, record: &MovieInfo) -> Option<String> {
        let missing =
            record.cast.is_empty() || record.cast.iter().any(|member| member.trim().is_empty());
        missing.then(|| "movieInfo.cast must be present".to_string())
    }
}

// =============================================================================
// Review rules
// =============================================================================

/// A review must reference a movie
pub struct MovieInfoIdRequired;

impl Rule<Review> for MovieInfoIdRequired {
    fn name(&self) -> &str {
        "MovieInfoIdRequired"
    }

    fn check(&self, record: &Review) -> Option<String> {
        let missing = record
            .movie_info_id
            .as_deref()
            .is_none_or(|id| id.trim().is_empty());
        missing.then(|| "reviewEntity.movieInfoId : must not be null".to_string())
    }
}

/// A rating, when given, must not be negative
pub struct NonNegativeRating;

impl Rule<Review> for NonNegativeRating {
    fn name(&self) -> &str {
        "NonNegativeRating"
    }

    fn check(&self, record: &Review) -> Option<String> {
        record.rating.filter(|rating| *rating < 0.0).map(|_| {
            "rating.negative : rating is negative and please pass a non-negative value".to_string()
        })
    }
}

/// Validator applied to movie-info records on create and update
pub fn movie_info_validator() -> Validator<MovieInfo> {
    Validator::new(",")
        .add_rule(NameRequired)
        .add_rule(PositiveYear)
        .add_rule(CastPresent)
        .add_rule(ReservedId::new("movieInfo.movieInfoId"))
}

/// Validator applied to reviews on create and update
pub fn review_validator() -> Validator<Review> {
    Validator::new(", ")
        .add_rule(MovieInfoIdRequired)
        .add_rule(NonNegativeRating)
        .add_rule(ReservedId::new("reviewEntity.reviewId"))
}
