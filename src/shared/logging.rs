//! Structured logging setup and per-operation spans.
//!
//! Library code only emits `tracing` events. Binaries call [`init_logging`]
//! once at startup.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{span, Level, Span};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::types::Mode;

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level, used when `RUST_LOG` is not set.
    pub level: LogLevel,

    /// Whether to include timestamps.
    pub timestamps: bool,

    /// Whether to include the event target.
    pub source_location: bool,

    /// Log format.
    pub format: LogFormat,
}

/// Log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level logging
    Trace,
    /// Debug level logging
    Debug,
    /// Info level logging
    Info,
    /// Warning level logging
    Warn,
    /// Error level logging
    Error,
}

/// Log format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON formatted logs
    Json,
    /// Pretty formatted logs
    Pretty,
    /// Compact formatted logs
    Compact,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            timestamps: true,
            source_location: true,
            format: LogFormat::Compact,
        }
    }
}

impl LogLevel {
    fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            other => Err(Error::validation(format!("unknown log level: {}", other))),
        }
    }
}

impl FromStr for LogFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            other => Err(Error::validation(format!("unknown log format: {}", other))),
        }
    }
}

/// Initialize the global subscriber.
///
/// `RUST_LOG` takes precedence over `config.level` when it is set.
pub fn init_logging(config: &LogConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_str()));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(config.source_location)
        .with_thread_ids(true);

    let fmt_layer = match (config.format, config.timestamps) {
        (LogFormat::Json, true) => fmt_layer.json().boxed(),
        (LogFormat::Json, false) => fmt_layer.json().without_time().boxed(),
        (LogFormat::Pretty, true) => fmt_layer.pretty().boxed(),
        (LogFormat::Pretty, false) => fmt_layer.pretty().without_time().boxed(),
        (LogFormat::Compact, true) => fmt_layer.compact().boxed(),
        (LogFormat::Compact, false) => fmt_layer.compact().without_time().boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| Error::internal(format!("failed to install subscriber: {}", e)))
}

/// Span wrapping one server operation from request to release.
pub fn operation_span(mode: Mode, duration_ms: u64) -> Span {
    span!(
        Level::INFO,
        "operation",
        operation_id = %Uuid::new_v4(),
        mode = %mode,
        duration_ms,
    )
}
