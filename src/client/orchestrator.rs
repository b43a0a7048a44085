//! Request orchestrator with supersession.
//!
//! At most one operation is current. Starting a new one cancels the
//! previous token and replaces the identity in the same critical section,
//! and every state mutation re-checks both under that lock. A superseded
//! operation can therefore finish in any order without touching the
//! state of its successor.

use futures::StreamExt;
use parking_lot::Mutex;
use reqwest::Response;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::{ClientConfig, Snapshot};
use crate::error::{Error, Result, TransportError};
use crate::shared::http_constants::STATUS_CLIENT_CLOSED_REQUEST;
use crate::shared::{decode_events, decoder_for, CancelToken, EventDecoder};
use crate::types::{Completion, Mode, OperationOutcome, RequestStatus, StreamEvent};

/// Identity and token of the current operation.
#[derive(Debug, Default)]
struct Current {
    id: u64,
    token: Option<CancelToken>,
}

struct Shared {
    config: ClientConfig,
    http: reqwest::Client,
    current: Mutex<Current>,
    state: watch::Sender<Snapshot>,
}

/// Drives operations against the mock server.
///
/// Cheap to clone; clones share the current operation.
#[derive(Clone)]
pub struct Orchestrator {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("config", &self.shared.config)
            .field("http", &"<reqwest::Client>")
            .field("current", &*self.shared.current.lock())
            .finish()
    }
}

impl Orchestrator {
    /// Create an orchestrator with a fresh HTTP client.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(Error::request)?;
        Ok(Self::with_http_client(config, http))
    }

    /// Create an orchestrator around an existing HTTP client.
    pub fn with_http_client(config: ClientConfig, http: reqwest::Client) -> Self {
        let (state, _) = watch::channel(Snapshot::default());
        Self {
            shared: Arc::new(Shared {
                config,
                http,
                current: Mutex::new(Current::default()),
                state,
            }),
        }
    }

    /// Start a new operation, superseding any in flight.
    ///
    /// This step is synchronous: once it returns, the previous operation's
    /// token has fired and the state already reads `Loading` for the new
    /// identity. Nothing is sent until [`Operation::run`] is awaited.
    pub fn begin(&self, mode: Mode, duration: Duration) -> Operation {
        let mut current = self.shared.current.lock();
        if let Some(previous) = current.token.take() {
            if previous.is_active() {
                debug!(request_id = current.id, "superseding operation");
            }
            previous.trigger();
        }
        current.id += 1;
        let token = CancelToken::new();
        current.token = Some(token.clone());
        let id = current.id;
        self.shared.state.send_replace(Snapshot::loading(id, mode));
        drop(current);

        Operation {
            id,
            mode,
            duration,
            token,
            shared: self.shared.clone(),
        }
    }

    /// [`begin`](Self::begin) then [`run`](Operation::run).
    pub async fn invoke(&self, mode: Mode, duration: Duration) -> OperationOutcome {
        self.begin(mode, duration).run().await
    }

    /// Cancel the current operation.
    ///
    /// The state reads `Cancelled` as soon as this returns. Returns `false`
    /// when nothing was in flight.
    pub fn cancel(&self) -> bool {
        let mut current = self.shared.current.lock();
        let Some(token) = current.token.take() else {
            return false;
        };
        token.trigger();
        let cancelled = self.shared.state.send_if_modified(|s| {
            if s.request_id == current.id && s.status == RequestStatus::Loading {
                s.status = RequestStatus::Cancelled;
                true
            } else {
                false
            }
        });
        if cancelled {
            info!(request_id = current.id, "operation cancelled");
        }
        cancelled
    }

    /// Current state.
    pub fn snapshot(&self) -> Snapshot {
        self.shared.state.borrow().clone()
    }

    /// Watch state transitions.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.shared.state.subscribe()
    }

    /// Configuration in use.
    pub fn config(&self) -> &ClientConfig {
        &self.shared.config
    }
}

/// One operation, created by [`Orchestrator::begin`].
pub struct Operation {
    id: u64,
    mode: Mode,
    duration: Duration,
    token: CancelToken,
    shared: Arc<Shared>,
}

impl std::fmt::Debug for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Operation")
            .field("id", &self.id)
            .field("mode", &self.mode)
            .field("duration", &self.duration)
            .field("token", &self.token)
            .finish()
    }
}

impl Operation {
    /// Identity of this operation.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Mode requested.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Token cancelling this operation.
    pub fn token(&self) -> &CancelToken {
        &self.token
    }

    /// Send the request and consume the response.
    ///
    /// The response body is owned by this future and released on every
    /// exit path. A cancelled or superseded operation returns
    /// [`OperationOutcome::Cancelled`] and leaves the state alone.
    pub async fn run(self) -> OperationOutcome {
        let result = self.execute().await;
        self.finish(result)
    }

    async fn execute(&self) -> Result<Completion> {
        let url = self.shared.config.endpoint()?;
        let duration = self.duration.as_millis().to_string();
        let request = self
            .shared
            .http
            .get(url)
            .query(&[("mode", self.mode.as_str()), ("duration", duration.as_str())]);

        debug!(request_id = self.id, mode = %self.mode, "sending request");
        let response = tokio::select! {
            biased;
            () = self.token.cancelled() => return Err(Error::Cancelled),
            sent = request.send() => sent.map_err(Error::request)?,
        };

        match decoder_for(self.mode) {
            None => self.read_single(response).await,
            Some(decoder) => self.read_events(response, decoder).await,
        }
    }

    async fn read_single(&self, response: Response) -> Result<Completion> {
        let status = response.status();
        if status.as_u16() == STATUS_CLIENT_CLOSED_REQUEST {
            return Err(Error::ServerAborted);
        }
        if !status.is_success() {
            return Err(Error::http_status(status.as_u16()));
        }

        let body = tokio::select! {
            biased;
            () = self.token.cancelled() => return Err(Error::Cancelled),
            body = response.bytes() => body.map_err(Error::request)?,
        };
        Ok(serde_json::from_slice(&body)?)
    }

    async fn read_events(
        &self,
        response: Response,
        decoder: Box<dyn EventDecoder>,
    ) -> Result<Completion> {
        let status = response.status();
        if !status.is_success() {
            return Err(Error::http_status(status.as_u16()));
        }

        let mut events = decode_events(response.bytes_stream(), decoder, self.token.clone());
        while let Some(event) = events.next().await {
            let applied = match event? {
                StreamEvent::Progress(progress) => self.apply(|s| {
                    s.progress = s.progress.max(progress.percent);
                }),
                StreamEvent::Heartbeat(_) => self.apply(|s| s.heartbeats += 1),
                StreamEvent::Complete(completion) => return Ok(completion),
            };
            if !applied {
                return Err(Error::Superseded(self.id));
            }
        }

        if self.token.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Err(Error::Transport(TransportError::ConnectionClosed))
        }
    }

    /// Mutate the state if this operation is still current and live.
    fn apply(&self, f: impl FnOnce(&mut Snapshot)) -> bool {
        let current = self.shared.current.lock();
        if current.id != self.id || self.token.is_cancelled() {
            return false;
        }
        self.shared.state.send_modify(f);
        true
    }

    fn finish(&self, result: Result<Completion>) -> OperationOutcome {
        let mut current = self.shared.current.lock();
        if current.id != self.id {
            debug!(request_id = self.id, "discarding superseded operation");
            return OperationOutcome::Cancelled;
        }
        if self.token.is_cancelled() {
            current.token = None;
            self.shared.state.send_if_modified(|s| {
                let loading = s.status == RequestStatus::Loading;
                if loading {
                    s.status = RequestStatus::Cancelled;
                }
                loading
            });
            return OperationOutcome::Cancelled;
        }
        current.token = None;

        match result {
            Ok(completion) => {
                info!(request_id = self.id, message = %completion.message, "operation succeeded");
                self.shared.state.send_modify(|s| {
                    s.status = RequestStatus::Succeeded;
                    s.progress = 100;
                    s.result = Some(completion.clone());
                });
                OperationOutcome::Completed(completion)
            },
            Err(e) => match e.failure_kind() {
                None => {
                    self.shared
                        .state
                        .send_modify(|s| s.status = RequestStatus::Cancelled);
                    OperationOutcome::Cancelled
                },
                Some(kind) => {
                    warn!(request_id = self.id, error = %kind, "operation failed");
                    self.shared.state.send_modify(|s| {
                        s.status = RequestStatus::Failed;
                        s.error = Some(kind.clone());
                    });
                    OperationOutcome::Failed(kind)
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn orchestrator() -> Orchestrator {
        Orchestrator::with_http_client(ClientConfig::default(), reqwest::Client::new())
    }

    #[test]
    fn begin_supersedes_previous() {
        let client = orchestrator();
        let first = client.begin(Mode::Stream, Duration::from_secs(5));
        let second = client.begin(Mode::Chunked, Duration::from_secs(5));

        assert!(first.token().is_cancelled());
        assert!(second.token().is_active());
        assert_eq!(second.id(), first.id() + 1);

        let snapshot = client.snapshot();
        assert_eq!(snapshot.status, RequestStatus::Loading);
        assert_eq!(snapshot.request_id, second.id());
        assert_eq!(snapshot.mode, Some(Mode::Chunked));
    }

    #[test]
    fn superseded_operation_cannot_apply() {
        let client = orchestrator();
        let first = client.begin(Mode::Stream, Duration::from_secs(5));
        assert!(first.apply(|s| s.progress = 20));
        let _second = client.begin(Mode::Stream, Duration::from_secs(5));

        assert!(!first.apply(|s| s.progress = 40));
        assert_eq!(first.finish(Err(Error::Cancelled)), OperationOutcome::Cancelled);
        assert_eq!(client.snapshot().progress, 0);
        assert_eq!(client.snapshot().status, RequestStatus::Loading);
    }

    #[test]
    fn cancel_is_immediate_and_idempotent() {
        let client = orchestrator();
        assert!(!client.cancel());

        let op = client.begin(Mode::Heartbeat, Duration::from_secs(30));
        assert!(client.cancel());
        assert!(op.token().is_cancelled());
        assert_eq!(client.snapshot().status, RequestStatus::Cancelled);
        assert!(!client.cancel());

        assert_eq!(op.finish(Err(Error::Cancelled)), OperationOutcome::Cancelled);
        assert_eq!(client.snapshot().status, RequestStatus::Cancelled);
    }

    #[tokio::test]
    async fn cancelled_before_send_applies_nothing() {
        let client = orchestrator();
        let op = client.begin(Mode::Stream, Duration::from_secs(5));
        client.cancel();

        assert_eq!(op.run().await, OperationOutcome::Cancelled);
        let snapshot = client.snapshot();
        assert_eq!(snapshot.status, RequestStatus::Cancelled);
        assert_eq!(snapshot.progress, 0);
        assert_eq!(snapshot.heartbeats, 0);
    }

    #[test]
    fn failure_is_recorded() {
        let client = orchestrator();
        let op = client.begin(Mode::Stream, Duration::from_secs(5));
        let outcome = op.finish(Err(Error::Transport(TransportError::ConnectionClosed)));

        assert_eq!(
            outcome,
            OperationOutcome::Failed(crate::error::FailureKind::StreamEnded)
        );
        let snapshot = client.snapshot();
        assert_eq!(snapshot.status, RequestStatus::Failed);
        assert_eq!(
            snapshot.error,
            Some(crate::error::FailureKind::StreamEnded)
        );
        assert!(!client.cancel());
    }
}
