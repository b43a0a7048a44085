//! Interruptible delay.

use std::time::Duration;

use super::cancellation::CancelToken;

/// How a [`delay`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelayOutcome {
    /// The full duration passed
    Elapsed,
    /// The token was triggered first
    Cancelled,
}

impl DelayOutcome {
    /// Whether the delay was cut short.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Wait for `duration` or until `token` is triggered, whichever comes first.
///
/// The timer lives inside the returned future, so it is dropped on either
/// exit path. A token that is already triggered resolves without arming a
/// timer.
///
/// # Examples
///
/// ```rust
/// use hangup::shared::cancellation::CancelToken;
/// use hangup::shared::delay::{delay, DelayOutcome};
/// use std::time::Duration;
///
/// # #[tokio::main]
/// # async fn main() {
/// let token = CancelToken::new();
/// token.trigger();
/// assert_eq!(
///     delay(Duration::from_secs(60), &token).await,
///     DelayOutcome::Cancelled
/// );
/// # }
/// ```
pub async fn delay(duration: Duration, token: &CancelToken) -> DelayOutcome {
    if token.is_cancelled() {
        return DelayOutcome::Cancelled;
    }
    if duration.is_zero() {
        return DelayOutcome::Elapsed;
    }

    tokio::select! {
        biased;
        () = token.cancelled() => DelayOutcome::Cancelled,
        () = tokio::time::sleep(duration) => DelayOutcome::Elapsed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn elapses_after_duration() {
        let token = CancelToken::new();
        let start = Instant::now();
        let outcome = delay(Duration::from_millis(3000), &token).await;
        assert_eq!(outcome, DelayOutcome::Elapsed);
        assert_eq!(start.elapsed(), Duration::from_millis(3000));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_resolves_early() {
        let token = CancelToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(250)).await;
            trigger.trigger();
        });

        let start = Instant::now();
        let outcome = delay(Duration::from_secs(30), &token).await;
        assert_eq!(outcome, DelayOutcome::Cancelled);
        assert_eq!(start.elapsed(), Duration::from_millis(250));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_duration_does_not_wait() {
        let token = CancelToken::new();
        let start = Instant::now();
        assert_eq!(delay(Duration::ZERO, &token).await, DelayOutcome::Elapsed);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn triggered_token_wins_over_zero_duration() {
        let token = CancelToken::new();
        token.trigger();
        assert!(delay(Duration::ZERO, &token).await.is_cancelled());
    }
}
