//! Disconnection-detection modes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// The technique the server uses to notice that the client went away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// One interruptible wait for the whole duration, single JSON body.
    #[default]
    Signal,
    /// Periodic progress ticks as newline-delimited JSON tagged `type`.
    Stream,
    /// Server-Sent Events with an independent heartbeat emitter.
    Heartbeat,
    /// Fine-grained ticks as newline-delimited JSON tagged `status`.
    Chunked,
}

impl Mode {
    /// All modes, in the order the client binary lists them.
    pub const ALL: [Mode; 4] = [Mode::Signal, Mode::Stream, Mode::Heartbeat, Mode::Chunked];

    /// Wire name used in the `mode` query parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Signal => "signal",
            Self::Stream => "stream",
            Self::Heartbeat => "heartbeat",
            Self::Chunked => "chunked",
        }
    }

    /// Human-readable name of the detection technique.
    pub fn technique(&self) -> &'static str {
        match self {
            Self::Signal => "AbortSignal",
            Self::Stream => "streaming",
            Self::Heartbeat => "heartbeat",
            Self::Chunked => "chunked transfer",
        }
    }

    /// Message carried by the completion unit.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hangup::types::Mode;
    ///
    /// assert_eq!(
    ///     Mode::Signal.completion_message(3000),
    ///     "Completed after 3000ms using AbortSignal"
    /// );
    /// ```
    pub fn completion_message(&self, duration_ms: u64) -> String {
        format!("Completed after {}ms using {}", duration_ms, self.technique())
    }

    /// Whether the response body is a stream of units rather than one object.
    pub fn is_streaming(&self) -> bool {
        !matches!(self, Self::Signal)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "signal" => Ok(Self::Signal),
            "stream" => Ok(Self::Stream),
            "heartbeat" => Ok(Self::Heartbeat),
            "chunked" => Ok(Self::Chunked),
            other => Err(Error::validation(format!("unknown mode: {}", other))),
        }
    }
}
