//! Signal mode: one interruptible wait, one JSON object.
//!
//! Detection happens while waiting. There is nothing to write until the
//! end, so a disconnect is only noticed through the token.

use crate::server::cancellation::OperationContext;
use crate::shared::{delay, DelayOutcome};
use crate::types::{Completion, Mode};

/// How a signal-mode operation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalOutcome {
    /// The full duration passed
    Completed(Completion),
    /// The token fired first; nothing was produced
    Aborted,
}

/// Wait for the whole duration unless the token fires first.
pub async fn run(ctx: &OperationContext) -> SignalOutcome {
    match delay(ctx.duration, &ctx.token).await {
        DelayOutcome::Elapsed => {
            SignalOutcome::Completed(Completion::now(Mode::Signal, ctx.duration_ms()))
        },
        DelayOutcome::Cancelled => SignalOutcome::Aborted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::CancelToken;
    use std::time::Duration;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn completes_with_signal_message() {
        let ctx = OperationContext::new(CancelToken::new(), Duration::from_millis(3000));
        let start = Instant::now();

        match run(&ctx).await {
            SignalOutcome::Completed(c) => {
                assert_eq!(c.mode, Mode::Signal);
                assert_eq!(c.message, "Completed after 3000ms using AbortSignal");
                assert_eq!(c.duration, 3000);
            },
            SignalOutcome::Aborted => panic!("expected completion"),
        }
        assert_eq!(start.elapsed(), Duration::from_millis(3000));
    }

    #[tokio::test(start_paused = true)]
    async fn aborts_when_token_fires() {
        let token = CancelToken::new();
        let ctx = OperationContext::new(token.clone(), Duration::from_secs(60));
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            token.trigger();
        });

        let start = Instant::now();
        assert_eq!(run(&ctx).await, SignalOutcome::Aborted);
        assert_eq!(start.elapsed(), Duration::from_millis(100));
    }
}
