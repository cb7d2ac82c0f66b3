//! Request-scoped cancellation.
//!
//! Every service and repository call receives a [`RequestContext`]. The
//! context is cancelled explicitly through its token or implicitly once its
//! deadline passes. Repositories check it before committing so that a
//! cancelled request never persists anything.

use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::{CancellationToken, DropGuard};

/// Error returned when work is attempted on a cancelled context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("request was cancelled")]
pub struct Cancelled;

/// Cancellation scope of a single request.
///
/// Clones share the same token, so cancelling any clone cancels all of them.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl RequestContext {
    /// Creates a context without a deadline.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a context that expires after `timeout`.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: Some(Instant::now() + timeout),
        }
    }

    /// Cancels this context and every clone of it.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Returns a guard that cancels this context when dropped.
    ///
    /// Held for the lifetime of a request future, so a disconnecting client
    /// cancels whatever the request was doing.
    #[must_use]
    pub fn cancel_on_drop(&self) -> DropGuard {
        self.token.clone().drop_guard()
    }

    /// Returns true once the token fired or the deadline passed.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled() || self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// Fails with [`Cancelled`] if the context is no longer active.
    ///
    /// # Errors
    ///
    /// Returns `Cancelled` when [`Self::is_cancelled`] is true.
    pub fn ensure_active(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }

    /// Completes when the context is cancelled or its deadline passes.
    pub async fn cancelled(&self) {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    () = self.token.cancelled() => {}
                    () = tokio::time::sleep_until(deadline) => {}
                }
            }
            None => self.token.cancelled().await,
        }
    }
}
