//! The four response strategies.
//!
//! Signal mode answers with one object and is driven directly by the
//! handler. The three streaming modes implement [`StreamingStrategy`] and
//! write through a [`UnitSink`].

use async_trait::async_trait;
use std::time::Duration;

use super::cancellation::OperationContext;
use super::sink::{Framing, UnitSink};
use crate::shared::delay;
use crate::types::{Completion, Mode};

pub mod chunked;
pub mod heartbeat;
pub mod signal;
pub mod stream;

pub use chunked::ChunkedStrategy;
pub use heartbeat::HeartbeatStrategy;
pub use signal::SignalOutcome;
pub use stream::StreamStrategy;

/// How a streaming strategy ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyOutcome {
    /// The completion unit was written
    Completed {
        /// Progress units written
        ticks: usize,
    },
    /// The token fired or a write failed; no completion unit was written
    Disconnected,
}

/// A disconnection-detection technique that streams its response.
#[async_trait]
pub trait StreamingStrategy: Send + Sync {
    /// Mode served by this strategy.
    fn mode(&self) -> Mode;

    /// Wire framing of the response body.
    fn framing(&self) -> Framing;

    /// Run the operation to completion or disconnection.
    ///
    /// Implementations must stop every activity they started before
    /// returning, and must trigger `ctx.token` when a write fails.
    async fn run(&self, ctx: &OperationContext, sink: &UnitSink) -> StrategyOutcome;
}

/// Strategy serving `mode`, or `None` for signal mode.
pub fn streaming_strategy(mode: Mode) -> Option<Box<dyn StreamingStrategy>> {
    match mode {
        Mode::Signal => None,
        Mode::Stream => Some(Box::new(StreamStrategy)),
        Mode::Heartbeat => Some(Box::new(HeartbeatStrategy)),
        Mode::Chunked => Some(Box::new(ChunkedStrategy)),
    }
}

/// Percent of `total` covered by `elapsed`, clamped to 100.
///
/// A zero total counts as fully done.
pub fn percent(elapsed: Duration, total: Duration) -> u8 {
    if total.is_zero() {
        return 100;
    }
    let pct = elapsed.as_nanos().saturating_mul(100) / total.as_nanos();
    pct.min(100) as u8
}

/// Tick durations covering `total` exactly.
///
/// Every tick is `tick` long except the last, which is shortened so the sum
/// never overshoots.
#[derive(Debug, Clone)]
pub struct TickSchedule {
    remaining: Duration,
    tick: Duration,
}

impl TickSchedule {
    /// Schedule `total` in steps of `tick` (a zero tick is raised to 1ms).
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hangup::server::strategies::TickSchedule;
    /// use std::time::Duration;
    ///
    /// let ticks: Vec<u128> = TickSchedule::new(Duration::from_millis(1200), Duration::from_millis(500))
    ///     .map(|d| d.as_millis())
    ///     .collect();
    /// assert_eq!(ticks, vec![500, 500, 200]);
    /// ```
    pub fn new(total: Duration, tick: Duration) -> Self {
        Self {
            remaining: total,
            tick: tick.max(Duration::from_millis(1)),
        }
    }
}

impl Iterator for TickSchedule {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        if self.remaining.is_zero() {
            return None;
        }
        let step = self.tick.min(self.remaining);
        self.remaining -= step;
        Some(step)
    }
}

/// Units a ticking strategy writes.
pub(crate) trait TickUnits: serde::Serialize + Send + Sync {
    fn start(mode: Mode, duration: u64) -> Self;
    fn progress(progress: u8, elapsed: u64, duration: u64) -> Self;
    fn complete(completion: Completion) -> Self;
}

/// Shared loop of the stream and chunked strategies.
///
/// Emits a start unit, one progress unit per tick, then the completion
/// unit. Cancellation is observed at every tick; a failed write triggers the
/// token and ends the loop.
pub(crate) async fn run_ticks<U: TickUnits>(
    mode: Mode,
    tick: Duration,
    ctx: &OperationContext,
    sink: &UnitSink,
) -> StrategyOutcome {
    let total_ms = ctx.duration_ms();

    if sink.emit(&U::start(mode, total_ms)).await.is_err() {
        return write_failed(ctx);
    }

    let mut elapsed = Duration::ZERO;
    let mut ticks = 0;
    for step in TickSchedule::new(ctx.duration, tick) {
        if delay(step, &ctx.token).await.is_cancelled() {
            tracing::debug!(ticks, "cancelled between ticks");
            return StrategyOutcome::Disconnected;
        }
        elapsed += step;

        let unit = U::progress(
            percent(elapsed, ctx.duration),
            u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            total_ms,
        );
        if sink.emit(&unit).await.is_err() {
            return write_failed(ctx);
        }
        ticks += 1;
    }

    if sink
        .emit(&U::complete(Completion::now(mode, total_ms)))
        .await
        .is_err()
    {
        return write_failed(ctx);
    }
    StrategyOutcome::Completed { ticks }
}

pub(crate) fn write_failed(ctx: &OperationContext) -> StrategyOutcome {
    tracing::debug!("write failed, peer is gone");
    ctx.token.trigger();
    StrategyOutcome::Disconnected
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schedule_never_overshoots() {
        for (total, tick) in [(5000, 1000), (1234, 500), (1, 500), (999, 1), (10, 3)] {
            let steps: Vec<Duration> =
                TickSchedule::new(Duration::from_millis(total), Duration::from_millis(tick))
                    .collect();
            let sum: Duration = steps.iter().sum();
            assert_eq!(sum, Duration::from_millis(total));
            assert!(steps.iter().all(|s| *s <= Duration::from_millis(tick)));
        }
    }

    #[test]
    fn zero_total_has_no_ticks() {
        assert_eq!(
            TickSchedule::new(Duration::ZERO, Duration::from_millis(500)).count(),
            0
        );
    }

    #[test]
    fn percent_is_clamped() {
        let total = Duration::from_millis(5000);
        assert_eq!(percent(Duration::ZERO, total), 0);
        assert_eq!(percent(Duration::from_millis(1000), total), 20);
        assert_eq!(percent(total, total), 100);
        assert_eq!(percent(Duration::from_millis(9000), total), 100);
        assert_eq!(percent(Duration::ZERO, Duration::ZERO), 100);
    }

    #[test]
    fn signal_has_no_streaming_strategy() {
        assert!(streaming_strategy(Mode::Signal).is_none());
        for mode in [Mode::Stream, Mode::Heartbeat, Mode::Chunked] {
            assert_eq!(streaming_strategy(mode).map(|s| s.mode()), Some(mode));
        }
    }
}
