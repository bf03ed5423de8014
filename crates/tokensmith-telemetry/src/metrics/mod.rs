//! Prometheus metrics for token issuance
//!
//! [`MetricsObserver`] plugs into the engine's observer hook and records:
//!
//! | Metric | Kind | Labels |
//! |--------|------|--------|
//! | `tokensmith_issuance_requests_total` | counter | `outcome` |
//! | `tokensmith_issuance_request_duration_seconds` | histogram | `outcome` |
//! | `tokensmith_tokens_total` | counter | `token_type`, `status` |
//! | `tokensmith_token_duration_seconds` | histogram | `token_type` |
//! | `tokensmith_issuer_not_found_total` | counter | `token_type` |
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tokensmith::observer::{CompositeObserver, TracingObserver};
//! use tokensmith_telemetry::metrics::MetricsObserver;
//!
//! let observer = CompositeObserver::default()
//!     .with(Arc::new(TracingObserver::new()))
//!     .with(Arc::new(MetricsObserver::new()));
//! ```

use std::sync::Once;
use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use tokensmith::error::{IssuerError, RegistryError};
use tokensmith::observer::{Observer, Probe};
use tokensmith::{RequestContext, Token, TokenType, TrustResult};

static INIT: Once = Once::new();

/// Register metric descriptions once per process
pub fn init_metrics() {
    INIT.call_once(|| {
        describe_counter!(
            "tokensmith_issuance_requests_total",
            "Total number of issue_tokens calls by outcome"
        );
        describe_histogram!(
            "tokensmith_issuance_request_duration_seconds",
            "Duration of issue_tokens calls in seconds"
        );
        describe_counter!(
            "tokensmith_tokens_total",
            "Total number of per-type issuance attempts by status"
        );
        describe_histogram!(
            "tokensmith_token_duration_seconds",
            "Duration of a single issuer call in seconds"
        );
        describe_counter!(
            "tokensmith_issuer_not_found_total",
            "Requests for token types with no registered issuer"
        );
    });
}

/// Label value for a failed token type
#[must_use]
pub fn failure_status(error: &IssuerError) -> &'static str {
    match error {
        IssuerError::Cancelled => "cancelled",
        IssuerError::DeadlineExceeded => "deadline_exceeded",
        IssuerError::NotImplemented(_) => "not_implemented",
        _ if error.is_interrupted() => "interrupted",
        _ => "error",
    }
}

/// Observer that records issuance metrics through the `metrics` facade
///
/// Without an installed recorder every call is a no-op.
#[derive(Debug, Clone, Default)]
pub struct MetricsObserver;

impl MetricsObserver {
    /// Create the observer and register metric descriptions
    #[must_use]
    pub fn new() -> Self {
        init_metrics();
        Self
    }
}

impl Observer for MetricsObserver {
    fn token_issuance_started(
        &self,
        ctx: &RequestContext,
        _subject: &TrustResult,
        _actor: Option<&TrustResult>,
        _scope: &str,
        _token_types: &[TokenType],
    ) -> (RequestContext, Box<dyn Probe>) {
        let probe = MetricsProbe {
            started: Instant::now(),
            current: None,
            outcome: Outcome::Success,
        };
        (ctx.clone(), Box::new(probe))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Success,
    Failed,
    IssuerNotFound,
}

impl Outcome {
    fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
            Self::IssuerNotFound => "issuer_not_found",
        }
    }
}

#[derive(Debug)]
struct MetricsProbe {
    started: Instant,
    current: Option<Instant>,
    outcome: Outcome,
}

impl MetricsProbe {
    fn record_type(&mut self, token_type: &TokenType, status: &'static str) {
        counter!(
            "tokensmith_tokens_total",
            "token_type" => token_type.to_string(),
            "status" => status
        )
        .increment(1);
        if let Some(started) = self.current.take() {
            histogram!(
                "tokensmith_token_duration_seconds",
                "token_type" => token_type.to_string()
            )
            .record(started.elapsed().as_secs_f64());
        }
    }
}

impl Probe for MetricsProbe {
    fn token_type_issuance_started(&mut self, _token_type: &TokenType) {
        self.current = Some(Instant::now());
    }

    fn token_type_issuance_succeeded(&mut self, token_type: &TokenType, _token: &Token) {
        self.record_type(token_type, "success");
    }

    fn token_type_issuance_failed(&mut self, token_type: &TokenType, error: &IssuerError) {
        self.outcome = Outcome::Failed;
        self.record_type(token_type, failure_status(error));
    }

    fn issuer_not_found(&mut self, token_type: &TokenType, _error: &RegistryError) {
        self.outcome = Outcome::IssuerNotFound;
        self.current = None;
        counter!(
            "tokensmith_issuer_not_found_total",
            "token_type" => token_type.to_string()
        )
        .increment(1);
    }

    fn end(&mut self) {
        let outcome = self.outcome.as_str();
        counter!("tokensmith_issuance_requests_total", "outcome" => outcome).increment(1);
        histogram!(
            "tokensmith_issuance_request_duration_seconds",
            "outcome" => outcome
        )
        .record(self.started.elapsed().as_secs_f64());
    }
}
