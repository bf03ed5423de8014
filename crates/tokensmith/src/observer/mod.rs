//! Issuance lifecycle observation
//!
//! The token service notifies an [`Observer`] once per `issue_tokens` call
//! and then reports every step of the call to the [`Probe`] it returns.
//! Probe events always follow the [`ProbeState`] machine:
//!
//! ```text
//! Idle ──TypeStarted(t)──▶ TypeInFlight(t) ──Succeeded(t) | Failed(t) | IssuerNotFound(t)──▶ Completed
//!                                 ▲                                                           │
//!                                 └──────────────────────TypeStarted(t')──────────────────────┤
//!                                                                                             └──End──▶ Ended
//! ```

mod composite;
mod recording;
mod state;
mod tracing_observer;

pub use composite::CompositeObserver;
pub use recording::{RecordedProbe, RecordingObserver};
pub use state::{ProbeEvent, ProbeState, ProbeTransitionError};
pub use tracing_observer::TracingObserver;

use crate::context::RequestContext;
use crate::error::{IssuerError, RegistryError};
use crate::token::{Token, TokenType};
use crate::types::TrustResult;

/// Creates a probe for each issuance request
pub trait Observer: Send + Sync + std::fmt::Debug {
    /// An `issue_tokens` call is starting
    ///
    /// Returns the context to use for the rest of the call, which the
    /// observer may enrich (for example with a tracing span), and the probe
    /// that receives the call's events.
    fn token_issuance_started(
        &self,
        ctx: &RequestContext,
        subject: &TrustResult,
        actor: Option<&TrustResult>,
        scope: &str,
        token_types: &[TokenType],
    ) -> (RequestContext, Box<dyn Probe>);
}

/// Receives the events of one `issue_tokens` call
pub trait Probe: Send {
    /// Issuance of `token_type` is starting
    fn token_type_issuance_started(&mut self, token_type: &TokenType);

    /// `token_type` was issued
    fn token_type_issuance_succeeded(&mut self, token_type: &TokenType, token: &Token);

    /// The issuer for `token_type` failed
    fn token_type_issuance_failed(&mut self, token_type: &TokenType, error: &IssuerError);

    /// No issuer is registered for `token_type`
    fn issuer_not_found(&mut self, token_type: &TokenType, error: &RegistryError);

    /// The call is over; no further events follow
    fn end(&mut self);
}

/// Observer that ignores everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl Observer for NoopObserver {
    fn token_issuance_started(
        &self,
        ctx: &RequestContext,
        _subject: &TrustResult,
        _actor: Option<&TrustResult>,
        _scope: &str,
        _token_types: &[TokenType],
    ) -> (RequestContext, Box<dyn Probe>) {
        (ctx.clone(), Box::new(NoopProbe))
    }
}

#[derive(Debug)]
struct NoopProbe;

impl Probe for NoopProbe {
    fn token_type_issuance_started(&mut self, _token_type: &TokenType) {}

    fn token_type_issuance_succeeded(&mut self, _token_type: &TokenType, _token: &Token) {}

    fn token_type_issuance_failed(&mut self, _token_type: &TokenType, _error: &IssuerError) {}

    fn issuer_not_found(&mut self, _token_type: &TokenType, _error: &RegistryError) {}

    fn end(&mut self) {}
}
