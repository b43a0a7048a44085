//! Units written to and read from the response body.
//!
//! The stream and heartbeat strategies tag their units with a `type` field,
//! the chunked strategy with a `status` field. Readers accept either.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::events::{HeartbeatEvent, ProgressEvent, StreamEvent};
use super::mode::Mode;

/// Result of a completed operation.
///
/// This is the whole response body in signal mode and the payload of the
/// terminal unit in every streaming mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    /// Mode that produced the result
    pub mode: Mode,
    /// Human-readable summary
    pub message: String,
    /// When the server finished the work
    pub timestamp: DateTime<Utc>,
    /// Requested duration in milliseconds
    pub duration: u64,
}

impl Completion {
    /// Build the completion for `mode` stamped with the current time.
    pub fn now(mode: Mode, duration: u64) -> Self {
        Self {
            mode,
            message: mode.completion_message(duration),
            timestamp: Utc::now(),
            duration,
        }
    }
}

/// Units tagged with a `type` field (stream and heartbeat modes).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TypedUnit {
    /// First unit of every response
    Start {
        /// Mode being served
        mode: Mode,
        /// Requested duration in milliseconds
        duration: u64,
        /// When the server started the work
        timestamp: DateTime<Utc>,
    },
    /// One tick of work
    Progress {
        /// Percent complete, 0..=100
        progress: u8,
        /// Milliseconds of work done so far
        elapsed: u64,
        /// Requested duration in milliseconds
        duration: u64,
    },
    /// Liveness marker
    Heartbeat {
        /// When the heartbeat was emitted
        timestamp: DateTime<Utc>,
    },
    /// Terminal unit
    Complete(Completion),
}

/// Units tagged with a `status` field (chunked mode).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum StatusUnit {
    /// First unit of every response
    Starting {
        /// Mode being served
        mode: Mode,
        /// Requested duration in milliseconds
        duration: u64,
        /// When the server started the work
        timestamp: DateTime<Utc>,
    },
    /// One tick of work
    Progress {
        /// Percent complete, 0..=100
        progress: u8,
        /// Milliseconds of work done so far
        elapsed: u64,
        /// Requested duration in milliseconds
        duration: u64,
    },
    /// Terminal unit
    Complete(Completion),
}

/// Loosely-typed view of one decoded unit.
///
/// Every field is optional so that unknown shapes decode successfully and
/// can be ignored by [`RawUnit::into_event`] instead of failing the line.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawUnit {
    /// `type` discriminator
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// `status` discriminator
    pub status: Option<String>,
    /// Percent complete
    pub progress: Option<f64>,
    /// Milliseconds elapsed
    pub elapsed: Option<u64>,
    /// Requested duration in milliseconds
    pub duration: Option<u64>,
    /// Mode that produced the unit, only interpreted on completion
    pub mode: Option<String>,
    /// Completion message
    pub message: Option<String>,
    /// Unit timestamp
    pub timestamp: Option<DateTime<Utc>>,
}

impl RawUnit {
    /// The discriminator, preferring `type` over `status`.
    pub fn discriminator(&self) -> Option<&str> {
        self.kind.as_deref().or(self.status.as_deref())
    }

    /// Convert into a client event, or `None` for shapes the client ignores.
    pub fn into_event(self) -> Option<StreamEvent> {
        match self.discriminator()? {
            "progress" => {
                let progress = self.progress?;
                if !progress.is_finite() {
                    return None;
                }
                Some(StreamEvent::Progress(ProgressEvent {
                    percent: progress.clamp(0.0, 100.0) as u8,
                    elapsed_ms: self.elapsed.unwrap_or(0),
                    total_ms: self.duration.unwrap_or(0),
                }))
            },
            "heartbeat" => Some(StreamEvent::Heartbeat(HeartbeatEvent {
                timestamp: self.timestamp?,
            })),
            "complete" => Some(StreamEvent::Complete(Completion {
                mode: self.mode?.parse().ok()?,
                message: self.message?,
                timestamp: self.timestamp?,
                duration: self.duration?,
            })),
            _ => None,
        }
    }
}
