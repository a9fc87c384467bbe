//! Error types for the catalog crate.

use thiserror::Error;

/// Errors that can occur in the catalog services
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CatalogError {
    /// One or more field rules failed.
    ///
    /// The message is the sorted, joined list of rule messages and is shown
    /// to the caller as-is.
    #[error("{0}")]
    Validation(String),

    /// No record exists for the given identifier
    #[error("{entity} not found for id {id}")]
    NotFound { entity: &'static str, id: String },
}

impl CatalogError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        CatalogError::NotFound {
            entity,
            id: id.into(),
        }
    }
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, CatalogError>;
