//! Decoded client events and operation outcomes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::wire::Completion;
use crate::error::FailureKind;

/// Progress reported by one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Percent complete, clamped to 0..=100
    pub percent: u8,
    /// Milliseconds of work done so far
    pub elapsed_ms: u64,
    /// Requested duration in milliseconds (0 if the server did not say)
    pub total_ms: u64,
}

/// Liveness marker from the heartbeat strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartbeatEvent {
    /// When the server emitted it
    pub timestamp: DateTime<Utc>,
}

/// One event decoded from a streaming body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Work advanced
    Progress(ProgressEvent),
    /// The server is still there
    Heartbeat(HeartbeatEvent),
    /// Work finished; always the last event of a completed stream
    Complete(Completion),
}

impl StreamEvent {
    /// Whether this event ends the operation.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete(_))
    }
}

/// How one client operation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationOutcome {
    /// The server finished and sent a result
    Completed(Completion),
    /// Cancelled locally, either by the user or by a newer request
    Cancelled,
    /// The request failed
    Failed(FailureKind),
}

impl OperationOutcome {
    /// The result, if the operation completed.
    pub fn completion(&self) -> Option<&Completion> {
        match self {
            Self::Completed(c) => Some(c),
            _ => None,
        }
    }
}

/// Observable lifecycle of the client's current operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    /// Nothing has been requested yet
    #[default]
    Idle,
    /// A request is in flight
    Loading,
    /// The last request completed
    Succeeded,
    /// The last request was cancelled
    Cancelled,
    /// The last request failed
    Failed,
}

impl RequestStatus {
    /// Whether the status is terminal for the current operation.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Cancelled | Self::Failed)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Succeeded => "succeeded",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}
