//! Per-operation context and the live-operation gauge.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::StrategyTimings;
use crate::shared::CancelToken;

/// Extra context passed to a strategy.
#[derive(Clone, Debug)]
pub struct OperationContext {
    /// Cancellation token for the operation
    pub token: CancelToken,
    /// Total simulated work
    pub duration: Duration,
    /// Tick and buffer settings
    pub timings: StrategyTimings,
}

impl OperationContext {
    /// Create new operation context.
    pub fn new(token: CancelToken, duration: Duration) -> Self {
        Self {
            token,
            duration,
            timings: StrategyTimings::default(),
        }
    }

    /// Set the timings.
    pub fn with_timings(mut self, timings: StrategyTimings) -> Self {
        self.timings = timings;
        self
    }

    /// Total duration in milliseconds, as reported on the wire.
    pub fn duration_ms(&self) -> u64 {
        u64::try_from(self.duration.as_millis()).unwrap_or(u64::MAX)
    }

    /// Check if the operation has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Counts operations whose resources have not been released yet.
#[derive(Clone, Debug, Default)]
pub struct OperationGauge {
    active: Arc<AtomicUsize>,
}

impl OperationGauge {
    /// Create a gauge reading zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new operation; it counts until the guard is dropped.
    pub fn enter(&self) -> GaugeGuard {
        self.active.fetch_add(1, Ordering::SeqCst);
        GaugeGuard {
            active: self.active.clone(),
        }
    }

    /// Operations currently live.
    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

/// Decrements its [`OperationGauge`] on drop.
#[derive(Debug)]
pub struct GaugeGuard {
    active: Arc<AtomicUsize>,
}

impl Drop for GaugeGuard {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gauge_counts_live_guards() {
        let gauge = OperationGauge::new();
        let first = gauge.enter();
        let second = gauge.clone().enter();
        assert_eq!(gauge.active(), 2);

        drop(first);
        assert_eq!(gauge.active(), 1);
        drop(second);
        assert_eq!(gauge.active(), 0);
    }

    #[test]
    fn context_reports_millis() {
        let token = CancelToken::new();
        let ctx = OperationContext::new(token.clone(), Duration::from_millis(1500));
        assert_eq!(ctx.duration_ms(), 1500);
        assert!(!ctx.is_cancelled());

        token.trigger();
        assert!(ctx.is_cancelled());
    }
}
