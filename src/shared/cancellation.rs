//! Per-operation cancellation token.
//!
//! A thin layer over [`tokio_util::sync::CancellationToken`] that adds
//! cleanup actions. Actions run at most once, on the first [`trigger`].
//!
//! [`trigger`]: CancelToken::trigger

use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

type CleanupAction = Box<dyn FnOnce() + Send + 'static>;

#[derive(Default)]
struct Cleanup {
    fired: bool,
    actions: Vec<CleanupAction>,
}

/// Liveness signal for a single operation.
///
/// Cloning is cheap and every clone observes the same state. Once triggered
/// a token never becomes active again.
#[derive(Clone)]
pub struct CancelToken {
    inner: CancellationToken,
    cleanup: Arc<Mutex<Cleanup>>,
}

impl CancelToken {
    /// Create a new, active token.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hangup::shared::cancellation::CancelToken;
    ///
    /// let token = CancelToken::new();
    /// assert!(token.is_active());
    /// token.trigger();
    /// token.trigger();
    /// assert!(!token.is_active());
    /// ```
    pub fn new() -> Self {
        Self {
            inner: CancellationToken::new(),
            cleanup: Arc::new(Mutex::new(Cleanup::default())),
        }
    }

    /// Whether the operation is still live.
    pub fn is_active(&self) -> bool {
        !self.inner.is_cancelled()
    }

    /// Whether the token has been triggered.
    pub fn is_cancelled(&self) -> bool {
        self.inner.is_cancelled()
    }

    /// Trigger cancellation. Idempotent.
    ///
    /// Wakes every pending [`cancelled`](Self::cancelled) future and runs the
    /// registered cleanup actions on the calling thread. The token reads as
    /// cancelled on every clone before this returns, even for a caller that
    /// lost the race to run the cleanup.
    pub fn trigger(&self) {
        self.inner.cancel();
        let actions = {
            let mut cleanup = self.cleanup.lock();
            if cleanup.fired {
                return;
            }
            cleanup.fired = true;
            std::mem::take(&mut cleanup.actions)
        };
        for action in actions {
            action();
        }
    }

    /// Register an action to run when the token is triggered.
    ///
    /// If the token was already triggered the action runs immediately.
    pub fn on_cancel<F>(&self, action: F)
    where
        F: FnOnce() + Send + 'static,
    {
        {
            let mut cleanup = self.cleanup.lock();
            if !cleanup.fired {
                cleanup.actions.push(Box::new(action));
                return;
            }
        }
        action();
    }

    /// Future that resolves once the token is triggered.
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.inner.cancelled()
    }

    /// Guard that triggers the token when dropped.
    ///
    /// Handing the guard to whatever the transport drops on disconnect turns
    /// the transport's abort into a token trigger.
    pub fn drop_guard(&self) -> TriggerOnDrop {
        TriggerOnDrop {
            token: Some(self.clone()),
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelToken")
            .field("active", &self.is_active())
            .field(
                "pending_cleanup",
                &self.cleanup.try_lock().map(|c| c.actions.len()).unwrap_or(0),
            )
            .finish()
    }
}

/// Triggers a [`CancelToken`] when dropped unless disarmed.
#[derive(Debug)]
pub struct TriggerOnDrop {
    token: Option<CancelToken>,
}

impl TriggerOnDrop {
    /// Drop the guard without triggering.
    pub fn disarm(mut self) -> CancelToken {
        self.token.take().unwrap_or_default()
    }
}

impl Drop for TriggerOnDrop {
    fn drop(&mut self) {
        if let Some(token) = self.token.take() {
            token.trigger();
        }
    }
}
