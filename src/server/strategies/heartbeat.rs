//! Heartbeat mode: SSE with an independent liveness emitter.
//!
//! Two activities share one operation: the main wait for the whole
//! duration and a task writing a heartbeat frame every interval. Both write
//! through the same sink and both stop when the operation's token fires.
//! The emitter is joined before the operation returns, so no periodic timer
//! outlives the response. A heartbeat due at the same instant the main wait
//! ends is not written; the completion unit follows the last earlier beat.

use async_trait::async_trait;
use chrono::Utc;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::Instrument;

use super::{write_failed, StrategyOutcome, StreamingStrategy};
use crate::server::cancellation::OperationContext;
use crate::server::sink::{Framing, UnitSink};
use crate::shared::{delay, CancelToken, DelayOutcome};
use crate::types::{Completion, Mode, TypedUnit};

/// Heartbeat every second while one delay covers the whole duration.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeartbeatStrategy;

#[async_trait]
impl StreamingStrategy for HeartbeatStrategy {
    fn mode(&self) -> Mode {
        Mode::Heartbeat
    }

    fn framing(&self) -> Framing {
        Framing::Sse
    }

    async fn run(&self, ctx: &OperationContext, sink: &UnitSink) -> StrategyOutcome {
        let total_ms = ctx.duration_ms();
        let start = TypedUnit::Start {
            mode: Mode::Heartbeat,
            duration: total_ms,
            timestamp: Utc::now(),
        };
        if sink.emit(&start).await.is_err() {
            return write_failed(ctx);
        }

        // Stops the emitter; fired on completion or by the operation token.
        let stop = CancelToken::new();
        {
            let stop = stop.clone();
            ctx.token.on_cancel(move || stop.trigger());
        }

        let deadline = Instant::now() + ctx.duration;
        let emitter = tokio::spawn(
            emit_heartbeats(ctx.clone(), sink.clone(), stop.clone(), deadline).in_current_span(),
        );

        let waited = delay(ctx.duration, &ctx.token).await;
        stop.trigger();
        let beats = match emitter.await {
            Ok(beats) => beats,
            Err(e) => {
                tracing::warn!(error = %e, "heartbeat emitter failed");
                0
            },
        };

        if waited == DelayOutcome::Cancelled || ctx.is_cancelled() {
            tracing::debug!(beats, "cancelled during heartbeat wait");
            return StrategyOutcome::Disconnected;
        }

        let complete = TypedUnit::Complete(Completion::now(Mode::Heartbeat, total_ms));
        if sink.emit(&complete).await.is_err() {
            return write_failed(ctx);
        }
        StrategyOutcome::Completed { ticks: 0 }
    }
}

/// Write a heartbeat every interval until `stop` fires or `deadline` is
/// reached; returns the count.
async fn emit_heartbeats(
    ctx: OperationContext,
    sink: UnitSink,
    stop: CancelToken,
    deadline: Instant,
) -> usize {
    let period = ctx.timings.heartbeat_interval.max(Duration::from_millis(1));
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut beats = 0;
    loop {
        tokio::select! {
            biased;
            () = stop.cancelled() => break,
            due = ticker.tick() => {
                if due >= deadline {
                    break;
                }
                let beat = TypedUnit::Heartbeat { timestamp: Utc::now() };
                if sink.emit(&beat).await.is_err() {
                    write_failed(&ctx);
                    break;
                }
                beats += 1;
            }
        }
    }
    beats
}
