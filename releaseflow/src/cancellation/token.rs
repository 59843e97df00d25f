//! Cancellation token shared by every stage of a run.

use std::future::Future;
use std::sync::OnceLock;
use tokio::sync::Notify;
use tracing::debug;

/// Cooperative cancellation for one release run.
///
/// The first reason wins; later calls to [`cancel`](Self::cancel) are ignored.
/// Hooks that block poll [`is_cancelled`](Self::is_cancelled), async work races
/// against [`cancelled`](Self::cancelled).
#[derive(Default)]
pub struct CancellationToken {
    reason: OnceLock<String>,
    notify: Notify,
}

impl CancellationToken {
    /// Creates a token that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Returns `false` if the run was already cancelled.
    pub fn cancel(&self, reason: impl Into<String>) -> bool {
        let reason = reason.into();
        if self.reason.set(reason).is_err() {
            return false;
        }
        debug!(reason = self.reason().unwrap_or_default(), "run cancelled");
        self.notify.notify_waiters();
        true
    }

    /// Returns whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.reason.get().is_some()
    }

    /// Returns the first cancellation reason.
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        self.reason.get().map(String::as_str)
    }

    /// Completes once cancellation has been requested.
    pub async fn cancelled(&self) {
        let notified = self.notify.notified();
        tokio::pin!(notified);
        // Register before reading the flag so a concurrent cancel is not missed.
        notified.as_mut().enable();
        if self.is_cancelled() {
            return;
        }
        notified.await;
    }

    /// Drives `work` to completion unless the run is cancelled first.
    ///
    /// Returns `None` when cancellation won; `work` is dropped at its current
    /// await point.
    pub async fn run_until_cancelled<F: Future>(&self, work: F) -> Option<F::Output> {
        tokio::select! {
            biased;
            () = self.cancelled() => None,
            output = work => Some(output),
        }
    }
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("reason", &self.reason())
            .finish()
    }
}
