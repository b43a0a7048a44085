//! Mock server exposing the four disconnection-detection strategies.
//!
//! Every request to `GET /mock` runs as its own task with its own
//! [`CancelToken`](crate::shared::CancelToken). The token is wired to the
//! transport: dropping the response body (or the handler future, in signal
//! mode) before the operation finished triggers it.

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

pub mod cancellation;
pub mod mock_server;
pub mod sink;
pub mod strategies;

pub use cancellation::{OperationContext, OperationGauge};
pub use mock_server::MockServer;
pub use sink::{Framing, UnitBody, UnitSink};
pub use strategies::{SignalOutcome, StrategyOutcome, StreamingStrategy};

/// Default duration when the request does not name one.
pub const DEFAULT_DURATION: Duration = Duration::from_millis(5000);

/// Default upper bound for a requested duration.
pub const DEFAULT_MAX_DURATION: Duration = Duration::from_secs(600);

/// Tick and buffer settings shared by the strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrategyTimings {
    /// Upper bound for one stream-mode tick.
    pub stream_tick_cap: Duration,
    /// Stream mode splits the duration into at least this many ticks.
    pub stream_tick_divisor: u32,
    /// Fixed chunked-mode tick.
    pub chunked_tick: Duration,
    /// Fixed heartbeat period.
    pub heartbeat_interval: Duration,
    /// Units buffered between a strategy and the response body.
    pub channel_capacity: usize,
}

impl Default for StrategyTimings {
    fn default() -> Self {
        Self {
            stream_tick_cap: Duration::from_millis(1000),
            stream_tick_divisor: 5,
            chunked_tick: Duration::from_millis(500),
            heartbeat_interval: Duration::from_millis(1000),
            channel_capacity: 16,
        }
    }
}

impl StrategyTimings {
    /// Stream-mode tick for a given total: `min(cap, total / divisor)`,
    /// never shorter than one millisecond.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hangup::server::StrategyTimings;
    /// use std::time::Duration;
    ///
    /// let timings = StrategyTimings::default();
    /// assert_eq!(timings.stream_tick(Duration::from_secs(30)), Duration::from_secs(1));
    /// assert_eq!(timings.stream_tick(Duration::from_millis(2000)), Duration::from_millis(400));
    /// ```
    pub fn stream_tick(&self, total: Duration) -> Duration {
        let divided = total / self.stream_tick_divisor.max(1);
        divided
            .min(self.stream_tick_cap)
            .max(Duration::from_millis(1))
    }
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind
    pub bind_addr: SocketAddr,
    /// Duration used when the query omits `duration`
    pub default_duration: Duration,
    /// Requests asking for more than this are rejected
    pub max_duration: Duration,
    /// Strategy timings
    pub timings: StrategyTimings,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::new(Ipv4Addr::LOCALHOST.into(), 3000),
            default_duration: DEFAULT_DURATION,
            max_duration: DEFAULT_MAX_DURATION,
            timings: StrategyTimings::default(),
        }
    }
}

impl ServerConfig {
    /// Set the bind address.
    pub fn with_bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set the default duration.
    pub fn with_default_duration(mut self, duration: Duration) -> Self {
        self.default_duration = duration;
        self
    }

    /// Set the maximum duration.
    pub fn with_max_duration(mut self, duration: Duration) -> Self {
        self.max_duration = duration;
        self
    }

    /// Set the strategy timings.
    pub fn with_timings(mut self, timings: StrategyTimings) -> Self {
        self.timings = timings;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_tick_is_bounded() {
        let timings = StrategyTimings::default();
        assert_eq!(
            timings.stream_tick(Duration::from_millis(5000)),
            Duration::from_millis(1000)
        );
        assert_eq!(
            timings.stream_tick(Duration::from_millis(3)),
            Duration::from_millis(1)
        );
        assert_eq!(timings.stream_tick(Duration::ZERO), Duration::from_millis(1));
    }

    #[test]
    fn config_builders() {
        let addr: SocketAddr = "0.0.0.0:8080".parse().unwrap();
        let config = ServerConfig::default()
            .with_bind_addr(addr)
            .with_default_duration(Duration::from_millis(10))
            .with_max_duration(Duration::from_secs(1));
        assert_eq!(config.bind_addr, addr);
        assert_eq!(config.default_duration, Duration::from_millis(10));
        assert_eq!(config.max_duration, Duration::from_secs(1));
    }
}
