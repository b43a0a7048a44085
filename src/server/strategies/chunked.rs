//! Chunked mode: fine-grained ticks as NDJSON tagged with `status`.

use async_trait::async_trait;

use super::{run_ticks, StrategyOutcome, StreamingStrategy, TickUnits};
use crate::server::cancellation::OperationContext;
use crate::server::sink::{Framing, UnitSink};
use crate::types::{Completion, Mode, StatusUnit};

/// Ticks every 500ms regardless of the total.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChunkedStrategy;

impl TickUnits for StatusUnit {
    fn start(mode: Mode, duration: u64) -> Self {
        StatusUnit::Starting {
            mode,
            duration,
            timestamp: chrono::Utc::now(),
        }
    }

    fn progress(progress: u8, elapsed: u64, duration: u64) -> Self {
        StatusUnit::Progress {
            progress,
            elapsed,
            duration,
        }
    }

    fn complete(completion: Completion) -> Self {
        StatusUnit::Complete(completion)
    }
}

#[async_trait]
impl StreamingStrategy for ChunkedStrategy {
    fn mode(&self) -> Mode {
        Mode::Chunked
    }

    fn framing(&self) -> Framing {
        Framing::Ndjson
    }

    async fn run(&self, ctx: &OperationContext, sink: &UnitSink) -> StrategyOutcome {
        run_ticks::<StatusUnit>(Mode::Chunked, ctx.timings.chunked_tick, ctx, sink).await
    }
}
