//! Cancellation and deadlines for blocking operations.
//!
//! Every operation that can block (a credential-store lookup or an HTTP
//! request) runs under a [`RequestContext`]. The context races the operation
//! against an optional deadline and an optional cancellation signal, so an
//! interrupted or expired invocation returns promptly instead of waiting for
//! a network timeout.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use xbe_core::RequestContext;
//!
//! let (ctx, canceller) = RequestContext::background()
//!     .with_timeout(Duration::from_secs(30))
//!     .cancellable();
//!
//! tokio::spawn(async move {
//!     tokio::signal::ctrl_c().await.ok();
//!     canceller.cancel();
//! });
//!
//! let response = client.get(&ctx, "/v1/brokers", &query).await?;
//! ```

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;
use tokio::time::Instant;

/// Why a context stopped an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ContextError {
    /// The caller cancelled the operation.
    #[error("operation cancelled")]
    Cancelled,

    /// The context deadline passed before the operation finished.
    #[error("deadline exceeded")]
    DeadlineExceeded,
}

/// Deadline and cancellation state for one invocation.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    deadline: Option<Instant>,
    cancel: Option<watch::Receiver<bool>>,
}

/// Handle that cancels every clone of the context it was created with.
#[derive(Debug, Clone)]
pub struct Canceller {
    tx: watch::Sender<bool>,
}

impl Canceller {
    /// Cancel the associated context. Calling this more than once is harmless.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    /// Check whether [`cancel`](Self::cancel) has been called.
    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

impl RequestContext {
    /// A context with no deadline that can never be cancelled.
    pub fn background() -> Self {
        Self::default()
    }

    /// Set a deadline relative to now.
    ///
    /// A timeout too large to represent as an instant leaves the deadline unset.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.with_deadline(deadline),
            None => self,
        }
    }

    /// Set an absolute deadline. An earlier existing deadline is kept.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) if existing < deadline => existing,
            _ => deadline,
        });
        self
    }

    /// Attach a fresh cancellation signal and return its handle.
    pub fn cancellable(mut self) -> (Self, Canceller) {
        let (tx, rx) = watch::channel(false);
        self.cancel = Some(rx);
        (self, Canceller { tx })
    }

    /// The deadline, if one is set.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Check the context without running anything.
    pub fn check(&self) -> Result<(), ContextError> {
        if self.is_cancelled() {
            return Err(ContextError::Cancelled);
        }
        if self.deadline.is_some_and(|d| d <= Instant::now()) {
            return Err(ContextError::DeadlineExceeded);
        }
        Ok(())
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Run `fut` to completion unless the context is cancelled or expires first.
    ///
    /// An already-cancelled or expired context returns without polling `fut`.
    pub async fn run<F>(&self, fut: F) -> Result<F::Output, ContextError>
    where
        F: Future,
    {
        self.check()?;

        let cancelled = wait_cancelled(self.cancel.clone());
        let expired = wait_deadline(self.deadline);

        tokio::select! {
            biased;
            _ = cancelled => Err(ContextError::Cancelled),
            _ = expired => Err(ContextError::DeadlineExceeded),
            output = fut => Ok(output),
        }
    }
}

async fn wait_cancelled(rx: Option<watch::Receiver<bool>>) {
    let Some(mut rx) = rx else {
        return std::future::pending().await;
    };
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            // Canceller dropped without cancelling.
            return std::future::pending().await;
        }
    }
}

async fn wait_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
