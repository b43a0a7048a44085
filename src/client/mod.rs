//! Client side: issue one operation at a time and track its state.
//!
//! # Examples
//!
//! ```rust,no_run
//! use hangup::client::{ClientConfig, Orchestrator};
//! use hangup::types::Mode;
//! use std::time::Duration;
//!
//! # async fn example() -> hangup::Result<()> {
//! let client = Orchestrator::new(ClientConfig::default())?;
//! let outcome = client.invoke(Mode::Stream, Duration::from_secs(5)).await;
//! println!("{:?} -> {}", outcome, client.snapshot().status);
//! # Ok(())
//! # }
//! ```

use serde::Serialize;
use url::Url;

use crate::error::{Error, FailureKind, Result};
use crate::shared::http_constants::MOCK_PATH;
use crate::types::{Completion, Mode, RequestStatus};

pub mod orchestrator;

pub use orchestrator::{Operation, Orchestrator};

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server root
    pub base_url: Url,
    /// Path of the mock endpoint, joined onto `base_url`
    pub endpoint_path: String,
    /// Sent as `User-Agent`
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:3000".parse().expect("Valid default URL"),
            endpoint_path: MOCK_PATH.to_string(),
            user_agent: format!("hangup-client/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ClientConfig {
    /// Point the client at another server.
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = base_url;
        self
    }

    /// Full URL of the mock endpoint.
    pub fn endpoint(&self) -> Result<Url> {
        self.base_url
            .join(&self.endpoint_path)
            .map_err(|e| Error::validation(format!("invalid endpoint: {}", e)))
    }
}

/// Observable state of the current operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    /// Lifecycle status
    pub status: RequestStatus,
    /// Identity of the operation this snapshot describes (0 before the first)
    pub request_id: u64,
    /// Mode of that operation
    pub mode: Option<Mode>,
    /// Highest progress percent seen
    pub progress: u8,
    /// Heartbeats received
    pub heartbeats: u64,
    /// Result, once succeeded
    pub result: Option<Completion>,
    /// Failure, once failed
    #[serde(skip)]
    pub error: Option<FailureKind>,
}

impl Snapshot {
    fn loading(request_id: u64, mode: Mode) -> Self {
        Self {
            status: RequestStatus::Loading,
            request_id,
            mode: Some(mode),
            ..Self::default()
        }
    }
}
