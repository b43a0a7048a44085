//! HTTP surface of the mock server.
use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Instrument};

use super::cancellation::{OperationContext, OperationGauge};
use super::sink::{UnitBody, UnitSink};
use super::strategies::{self, signal, SignalOutcome, StrategyOutcome};
use super::ServerConfig;
use crate::error::{Error, Result};
use crate::shared::http_constants::{
    HEALTH_PATH, MOCK_PATH, STATUS_CLIENT_CLOSED_REQUEST, TEXT_PLAIN,
};
use crate::shared::logging::operation_span;
use crate::shared::CancelToken;
use crate::types::Mode;

/// Shared state behind every handler.
#[derive(Debug)]
struct ServerState {
    config: ServerConfig,
    gauge: OperationGauge,
    shutdown: CancellationToken,
}

/// Mock server answering `GET /mock?mode=..&duration=..`.
///
/// Cloning is cheap; clones share the live-operation gauge and the shutdown
/// signal.
///
/// # Examples
///
/// ```rust,no_run
/// use hangup::server::{MockServer, ServerConfig};
///
/// # async fn example() -> hangup::Result<()> {
/// let server = MockServer::new(ServerConfig::default());
/// let (addr, task) = server.start().await?;
/// println!("listening on {}", addr);
/// server.shutdown();
/// task.await.ok();
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct MockServer {
    state: Arc<ServerState>,
}

impl MockServer {
    /// Creates a new MockServer.
    pub fn new(config: ServerConfig) -> Self {
        Self {
            state: Arc::new(ServerState {
                config,
                gauge: OperationGauge::new(),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    /// Configuration in use.
    pub fn config(&self) -> &ServerConfig {
        &self.state.config
    }

    /// Router serving the mock and health endpoints.
    pub fn router(&self) -> Router {
        Router::new()
            .route(MOCK_PATH, get(handle_mock))
            .route(HEALTH_PATH, get(|| async { "ok" }))
            .with_state(self.state.clone())
    }

    /// Starts the server and returns the bound address and a task handle.
    ///
    /// The task ends after [`shutdown`](Self::shutdown) once in-flight
    /// responses have finished.
    pub async fn start(&self) -> Result<(SocketAddr, tokio::task::JoinHandle<()>)> {
        let listener = tokio::net::TcpListener::bind(self.state.config.bind_addr)
            .await
            .map_err(crate::error::TransportError::from)?;
        let local_addr = listener
            .local_addr()
            .map_err(crate::error::TransportError::from)?;
        let app = self.router();
        let shutdown = self.state.shutdown.clone();

        info!(addr = %local_addr, "mock server listening");
        let server_task = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(shutdown.cancelled_owned())
                .await
            {
                warn!(error = %e, "mock server stopped with error");
            }
        });

        Ok((local_addr, server_task))
    }

    /// Stop accepting connections and cancel every in-flight operation.
    pub fn shutdown(&self) {
        self.state.shutdown.cancel();
    }

    /// Operations whose resources have not been released yet.
    pub fn active_operations(&self) -> usize {
        self.state.gauge.active()
    }
}

/// Raw query string of `GET /mock`.
#[derive(Debug, Default, Deserialize)]
struct MockQuery {
    mode: Option<String>,
    duration: Option<String>,
}

impl MockQuery {
    fn mode(&self) -> Result<Mode> {
        match self.mode.as_deref() {
            None | Some("") => Ok(Mode::default()),
            Some(mode) => mode.parse(),
        }
    }

    /// Negative durations count as zero.
    fn duration(&self, config: &ServerConfig) -> Result<Duration> {
        let Some(raw) = self.duration.as_deref().filter(|d| !d.is_empty()) else {
            return Ok(config.default_duration);
        };
        let ms: i64 = raw
            .trim()
            .parse()
            .map_err(|_| Error::validation(format!("invalid duration: {}", raw)))?;
        let duration = Duration::from_millis(ms.max(0).unsigned_abs());
        if duration > config.max_duration {
            return Err(Error::validation(format!(
                "duration {}ms exceeds maximum of {}ms",
                ms,
                config.max_duration.as_millis()
            )));
        }
        Ok(duration)
    }
}

async fn handle_mock(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<MockQuery>,
) -> Result<Response> {
    let mode = query.mode()?;
    let duration = query.duration(&state.config)?;

    let token = CancelToken::new();
    let ctx = OperationContext::new(token.clone(), duration).with_timings(state.config.timings);
    let span = operation_span(mode, ctx.duration_ms());
    {
        let span = span.clone();
        token.on_cancel(move || span.in_scope(|| info!("operation cancelled")));
    }

    match strategies::streaming_strategy(mode) {
        None => run_signal(state, ctx).instrument(span).await,
        Some(strategy) => {
            let (sink, rx) = UnitSink::channel(strategy.framing(), ctx.timings.channel_capacity);
            let body = UnitBody::new(rx, token.drop_guard());
            let content_type = strategy.framing().content_type();
            let live = state.gauge.enter();
            let shutdown = state.shutdown.clone();

            tokio::spawn(
                async move {
                    let _live = live;
                    info!("operation started");
                    let run = strategy.run(&ctx, &sink);
                    tokio::pin!(run);
                    let outcome = tokio::select! {
                        outcome = &mut run => outcome,
                        () = shutdown.cancelled() => {
                            ctx.token.trigger();
                            run.await
                        }
                    };
                    match outcome {
                        StrategyOutcome::Completed { ticks } => info!(ticks, "operation completed"),
                        StrategyOutcome::Disconnected => info!("operation ended early"),
                    }
                }
                .instrument(span),
            );

            Ok(streaming_response(content_type, Body::from_stream(body)))
        },
    }
}

/// Drive signal mode inside the handler.
///
/// The wait runs as its own task while the handler future holds a guard on
/// the token: if the server drops the handler because the client went
/// away, the guard fires and the task stops.
async fn run_signal(state: Arc<ServerState>, ctx: OperationContext) -> Result<Response> {
    let guard = ctx.token.drop_guard();
    let live = state.gauge.enter();
    let token = ctx.token.clone();
    info!("operation started");

    let task = tokio::spawn(
        async move {
            let _live = live;
            signal::run(&ctx).await
        }
        .in_current_span(),
    );
    tokio::pin!(task);

    let joined = tokio::select! {
        joined = &mut task => joined,
        () = state.shutdown.cancelled() => {
            token.trigger();
            task.await
        }
    };
    let _ = guard.disarm();

    match joined {
        Ok(SignalOutcome::Completed(completion)) => {
            info!("operation completed");
            Ok(Json(completion).into_response())
        },
        Ok(SignalOutcome::Aborted) => Err(Error::ServerAborted),
        Err(e) => Err(Error::internal(format!("signal task failed: {}", e))),
    }
}

fn streaming_response(content_type: &'static str, body: Body) -> Response {
    let mut response = Response::new(body);
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(
        header::HeaderName::from_static("x-accel-buffering"),
        HeaderValue::from_static("no"),
    );
    response
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::ServerAborted => StatusCode::from_u16(STATUS_CLIENT_CLOSED_REQUEST)
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            warn!(error = %self, "request failed");
        }
        let body = match &self {
            Error::Validation(msg) => msg.clone(),
            Error::ServerAborted => "Request cancelled".to_string(),
            other => other.to_string(),
        };
        (status, [(header::CONTENT_TYPE, TEXT_PLAIN)], body).into_response()
    }
}
