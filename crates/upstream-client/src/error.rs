//! Fault classification for upstream calls.
//!
//! Every failed call ends up as one `UpstreamError`. The variant carries the
//! original status and message of the upstream so that they can be shown to
//! the caller unchanged, and `kind()` reduces it to the `FaultKind` that the
//! retry policy decides on.

use thiserror::Error;

/// Coarse classification used for retry decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultKind {
    /// 404 from the upstream. A client fault with its own meaning for aggregation.
    NotFound,
    /// Any other 4xx. Permanent.
    Client,
    /// 5xx. Transient.
    Server,
    /// Connection refused, reset or timed out. Transient.
    Transport,
    /// The upstream answered 2xx with a body we could not decode. Permanent.
    Malformed,
}

impl FaultKind {
    /// Server and transport faults may go away on their own
    pub fn is_retryable(self) -> bool {
        matches!(self, FaultKind::Server | FaultKind::Transport)
    }
}

/// Errors returned by the upstream clients
#[derive(Error, Debug, Clone, PartialEq)]
pub enum UpstreamError {
    #[error("{message}")]
    NotFound { message: String },

    #[error("{message}")]
    Client { status: u16, message: String },

    #[error("{message}")]
    Server { status: u16, message: String },

    #[error("upstream unreachable: {0}")]
    Transport(String),

    #[error("malformed upstream response: {0}")]
    Malformed(String),
}

impl UpstreamError {
    /// Classify a non-success HTTP status and its body
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        let message = body.into();
        match status {
            404 => UpstreamError::NotFound { message },
            500.. => UpstreamError::Server { status, message },
            _ => UpstreamError::Client { status, message },
        }
    }

    pub fn kind(&self) -> FaultKind {
        match self {
            UpstreamError::NotFound { .. } => FaultKind::NotFound,
            UpstreamError::Client { .. } => FaultKind::Client,
            UpstreamError::Server { .. } => FaultKind::Server,
            UpstreamError::Transport(_) => FaultKind::Transport,
            UpstreamError::Malformed(_) => FaultKind::Malformed,
        }
    }

    /// HTTP status reported by the upstream, if it answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            UpstreamError::NotFound { .. } => Some(404),
            UpstreamError::Client { status, .. } | UpstreamError::Server { status, .. } => {
                Some(*status)
            }
            UpstreamError::Transport(_) | UpstreamError::Malformed(_) => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == FaultKind::NotFound
    }

    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}

/// Every reqwest failure is a transport fault. That includes a connection
/// dropped while the body is read, which reqwest reports as a decode error.
/// Bodies are decoded with serde_json separately so only real parse failures
/// become `Malformed`.
impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        UpstreamError::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for UpstreamError {
    fn from(err: serde_json::Error) -> Self {
        UpstreamError::Malformed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert_eq!(UpstreamError::from_status(404, "gone").kind(), FaultKind::NotFound);
        assert_eq!(UpstreamError::from_status(400, "bad").kind(), FaultKind::Client);
        assert_eq!(UpstreamError::from_status(422, "bad").kind(), FaultKind::Client);
        assert_eq!(UpstreamError::from_status(500, "down").kind(), FaultKind::Server);
        assert_eq!(UpstreamError::from_status(503, "down").kind(), FaultKind::Server);
    }

    #[test]
    fn test_only_server_and_transport_retry() {
        assert!(FaultKind::Server.is_retryable());
        assert!(FaultKind::Transport.is_retryable());
        assert!(!FaultKind::NotFound.is_retryable());
        assert!(!FaultKind::Client.is_retryable());
        assert!(!FaultKind::Malformed.is_retryable());
    }

    #[test]
    fn test_message_and_status_preserved() {
        let err = UpstreamError::from_status(503, "MovieInfo Service Unavailable");
        assert_eq!(err.to_string(), "MovieInfo Service Unavailable");
        assert_eq!(err.status(), Some(503));
        assert_eq!(UpstreamError::Transport("refused".into()).status(), None);
    }
}
