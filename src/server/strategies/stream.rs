//! Stream mode: periodic progress as NDJSON tagged with `type`.

use async_trait::async_trait;

use super::{run_ticks, StrategyOutcome, StreamingStrategy, TickUnits};
use crate::server::cancellation::OperationContext;
use crate::server::sink::{Framing, UnitSink};
use crate::types::{Completion, Mode, TypedUnit};

/// Ticks every `min(1000ms, total / 5)`; a disconnect is noticed on the
/// next tick or the next write.
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamStrategy;

impl TickUnits for TypedUnit {
    fn start(mode: Mode, duration: u64) -> Self {
        TypedUnit::Start {
            mode,
            duration,
            timestamp: chrono::Utc::now(),
        }
    }

    fn progress(progress: u8, elapsed: u64, duration: u64) -> Self {
        TypedUnit::Progress {
            progress,
            elapsed,
            duration,
        }
    }

    fn complete(completion: Completion) -> Self {
        TypedUnit::Complete(completion)
    }
}

#[async_trait]
impl StreamingStrategy for StreamStrategy {
    fn mode(&self) -> Mode {
        Mode::Stream
    }

    fn framing(&self) -> Framing {
        Framing::Ndjson
    }

    async fn run(&self, ctx: &OperationContext, sink: &UnitSink) -> StrategyOutcome {
        let tick = ctx.timings.stream_tick(ctx.duration);
        run_ticks::<TypedUnit>(Mode::Stream, tick, ctx, sink).await
    }
}
