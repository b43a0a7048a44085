//! Error types for hangup.
//!
//! Cancellation and supersession are modelled as errors so they can flow
//! through `?` inside read loops, but they are never fatal: the orchestrator
//! folds them into an [`OperationOutcome`](crate::types::OperationOutcome)
//! before anything reaches the caller.

use std::fmt;
use thiserror::Error;

/// Result type alias for hangup operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type.
#[derive(Error, Debug)]
pub enum Error {
    /// Transport-level errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid request parameters
    #[error("Validation error: {0}")]
    Validation(String),

    /// The server observed cancellation before completing (status 499)
    #[error("Request was cancelled by the server")]
    ServerAborted,

    /// The response belongs to a request that has been replaced
    #[error("Request {0} was superseded")]
    Superseded(u64),

    /// Internal errors
    #[error("Internal error: {0}")]
    Internal(String),

    /// Cancelled operation
    #[error("Operation cancelled")]
    Cancelled,

    /// Other errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Transport-specific errors.
#[derive(Error, Debug)]
pub enum TransportError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The peer closed the stream before a completion unit arrived
    #[error("Connection closed")]
    ConnectionClosed,

    /// Non-success HTTP status
    #[error("HTTP status {status}")]
    Http {
        /// Status code returned by the server
        status: u16,
    },

    /// Request could not be sent or the body could not be read
    #[error("Request failed: {0}")]
    Request(String),
}

impl Error {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create a transport error from a non-success status code.
    pub fn http_status(status: u16) -> Self {
        Self::Transport(TransportError::Http { status })
    }

    /// Create a transport error for a failed request.
    pub fn request(message: impl fmt::Display) -> Self {
        Self::Transport(TransportError::Request(message.to_string()))
    }

    /// Whether this error only signals that the operation was abandoned
    /// locally (cancelled or superseded) and must not be surfaced.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Superseded(_))
    }

    /// Classify a surfaced error into the failure kind reported to the user.
    ///
    /// Returns `None` for cancellation and supersession.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::Cancelled | Self::Superseded(_) => None,
            Self::ServerAborted => Some(FailureKind::ServerAborted),
            Self::Transport(TransportError::ConnectionClosed) => Some(FailureKind::StreamEnded),
            Self::Transport(TransportError::Http { status }) => {
                Some(FailureKind::Http { status: *status })
            },
            Self::Serialization(e) => Some(FailureKind::InvalidBody(e.to_string())),
            other => Some(FailureKind::Network(other.to_string())),
        }
    }
}

/// Why an operation failed, as seen by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// The server reported that it abandoned the request (status 499).
    ServerAborted,
    /// The server answered with an unexpected status.
    Http {
        /// Status code
        status: u16,
    },
    /// The stream ended without a completion unit and nobody cancelled.
    StreamEnded,
    /// A single-object body could not be decoded.
    InvalidBody(String),
    /// The request could not be sent or the body could not be read.
    Network(String),
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ServerAborted => write!(f, "request was cancelled by the server"),
            Self::Http { status } => write!(f, "request failed with status {}", status),
            Self::StreamEnded => write!(f, "stream ended before completion"),
            Self::InvalidBody(e) => write!(f, "invalid response body: {}", e),
            Self::Network(e) => write!(f, "request failed: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancellation_is_never_surfaced() {
        assert!(Error::Cancelled.is_cancellation());
        assert!(Error::Superseded(3).is_cancellation());
        assert_eq!(Error::Cancelled.failure_kind(), None);
        assert_eq!(Error::Superseded(3).failure_kind(), None);
    }

    #[test]
    fn failure_classification() {
        assert_eq!(
            Error::ServerAborted.failure_kind(),
            Some(FailureKind::ServerAborted)
        );
        assert_eq!(
            Error::http_status(503).failure_kind(),
            Some(FailureKind::Http { status: 503 })
        );
        assert_eq!(
            Error::Transport(TransportError::ConnectionClosed).failure_kind(),
            Some(FailureKind::StreamEnded)
        );
        assert!(matches!(
            Error::request("connection refused").failure_kind(),
            Some(FailureKind::Network(msg)) if msg.contains("connection refused")
        ));
    }

    #[test]
    fn failure_kind_display() {
        assert_eq!(
            FailureKind::Http { status: 500 }.to_string(),
            "request failed with status 500"
        );
        assert_eq!(
            FailureKind::ServerAborted.to_string(),
            "request was cancelled by the server"
        );
    }
}
