//! # hangup
//!
//! Long-running HTTP responses that notice when the client goes away.
//!
//! The server side simulates work of a requested duration and answers in one
//! of four modes, each a different way of detecting that the client
//! disconnected:
//! - `signal`: one JSON object at the end; the handler's cancellation stops
//!   the wait
//! - `stream`: NDJSON progress units; a failed write stops the work
//! - `heartbeat`: SSE with a periodic liveness frame alongside the wait
//! - `chunked`: NDJSON with fixed half-second ticks
//!
//! The client side issues one operation at a time. Starting a new operation
//! supersedes the previous one, and a superseded or cancelled operation
//! never touches the observable state again.
//!
//! ## Quick Start
//!
//! ### Server Example
//!
//! ```rust,no_run
//! use hangup::server::{MockServer, ServerConfig};
//!
//! # async fn example() -> hangup::Result<()> {
//! let server = MockServer::new(ServerConfig::default());
//! let (addr, task) = server.start().await?;
//! println!("listening on http://{}", addr);
//! task.await.ok();
//! # Ok(())
//! # }
//! ```
//!
//! ### Client Example
//!
//! ```rust,no_run
//! use hangup::client::{ClientConfig, Orchestrator};
//! use hangup::types::Mode;
//! use std::time::Duration;
//!
//! # async fn example() -> hangup::Result<()> {
//! let client = Orchestrator::new(ClientConfig::default())?;
//! let mut updates = client.subscribe();
//!
//! let op = client.begin(Mode::Heartbeat, Duration::from_secs(10));
//! tokio::spawn(op.run());
//!
//! while updates.changed().await.is_ok() {
//!     let snapshot = updates.borrow().clone();
//!     println!("{} heartbeats={}", snapshot.status, snapshot.heartbeats);
//!     if snapshot.status.is_terminal() {
//!         break;
//!     }
//! }
//! # Ok(())
//! # }
//! ```

#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]
#![deny(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::multiple_crate_versions)]
#![allow(clippy::result_large_err)]

#[cfg(feature = "client")]
#[cfg_attr(docsrs, doc(cfg(feature = "client")))]
pub mod client;
pub mod error;
#[cfg(feature = "server")]
#[cfg_attr(docsrs, doc(cfg(feature = "server")))]
pub mod server;
pub mod shared;
pub mod types;

// Re-export commonly used types
#[cfg(feature = "client")]
pub use client::{ClientConfig, Operation, Orchestrator, Snapshot};
pub use error::{Error, FailureKind, Result, TransportError};
#[cfg(feature = "server")]
pub use server::{MockServer, ServerConfig, StrategyTimings};
pub use shared::{
    decode_events, delay, init_logging, CancelToken, DelayOutcome, LogConfig, LogFormat, LogLevel,
    NdjsonDecoder, SseDecoder,
};
pub use types::{Completion, Mode, OperationOutcome, RequestStatus, StreamEvent};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
