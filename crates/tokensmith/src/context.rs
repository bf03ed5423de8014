//! Request-scoped execution context
//!
//! [`RequestContext`] carries cancellation, an optional deadline and the
//! tracing span of one inbound request into issuers and data sources.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::Span;

/// Reason a context-bound operation stopped early
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Interrupted {
    /// The request was cancelled by the caller
    #[error("request cancelled")]
    Cancelled,
    /// The request deadline passed
    #[error("request deadline exceeded")]
    DeadlineExceeded,
}

/// Cancellation, deadline and span for one request
#[derive(Debug, Clone)]
pub struct RequestContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
    span: Span,
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestContext {
    /// Context with no deadline, attached to the current span
    #[must_use]
    pub fn new() -> Self {
        Self {
            cancel: CancellationToken::new(),
            deadline: None,
            span: Span::current(),
        }
    }

    /// Context cancelled through an externally owned token
    #[must_use]
    pub fn with_cancellation(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            ..Self::new()
        }
    }

    /// Set an absolute deadline, keeping the earlier one if already set
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        self
    }

    /// Set a deadline relative to now
    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Replace the span that carries this request
    #[must_use]
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Derive a context that is cancelled with this one but can also be
    /// cancelled on its own
    #[must_use]
    pub fn child(&self) -> Self {
        Self {
            cancel: self.cancel.child_token(),
            deadline: self.deadline,
            span: self.span.clone(),
        }
    }

    /// Cancel this context and every child derived from it
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Whether cancellation was requested
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// The deadline, if any
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// The request span
    #[must_use]
    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Why the context is no longer usable, if it isn't
    #[must_use]
    pub fn interrupted(&self) -> Option<Interrupted> {
        if self.cancel.is_cancelled() {
            Some(Interrupted::Cancelled)
        } else if self.deadline.is_some_and(|d| d <= Instant::now()) {
            Some(Interrupted::DeadlineExceeded)
        } else {
            None
        }
    }

    /// Drive `fut` to completion unless the context is cancelled or its
    /// deadline passes first
    ///
    /// # Errors
    ///
    /// Returns [`Interrupted`] when cancellation or the deadline wins the race.
    pub async fn run<F, T>(&self, fut: F) -> Result<T, Interrupted>
    where
        F: Future<Output = T>,
    {
        if let Some(reason) = self.interrupted() {
            return Err(reason);
        }

        let deadline = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(Interrupted::Cancelled),
            () = deadline => Err(Interrupted::DeadlineExceeded),
            value = fut => Ok(value),
        }
    }
}
