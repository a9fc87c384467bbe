//! Error types for the hub crate.

use thiserror::Error;

/// Errors returned by [`BroadcastHub`](crate::BroadcastHub)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HubError {
    /// The hub was shut down; no further records are accepted
    #[error("broadcast hub is closed")]
    Closed,
}
