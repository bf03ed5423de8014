use std::sync::Arc;

use super::{Observer, Probe};
use crate::context::RequestContext;
use crate::error::{IssuerError, RegistryError};
use crate::token::{Token, TokenType};
use crate::types::TrustResult;

/// Fans issuance events out to several observers
///
/// Observers are notified in registration order. Each one receives the
/// context returned by the one before it, so enrichments such as spans
/// accumulate; the last context is returned to the caller.
#[derive(Debug, Clone, Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn Observer>>,
}

impl CompositeObserver {
    /// Composite over `observers`
    #[must_use]
    pub fn new(observers: Vec<Arc<dyn Observer>>) -> Self {
        Self { observers }
    }

    /// Append an observer
    #[must_use]
    pub fn with(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Number of child observers
    #[must_use]
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    /// Whether there are no child observers
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl Observer for CompositeObserver {
    fn token_issuance_started(
        &self,
        ctx: &RequestContext,
        subject: &TrustResult,
        actor: Option<&TrustResult>,
        scope: &str,
        token_types: &[TokenType],
    ) -> (RequestContext, Box<dyn Probe>) {
        let mut ctx = ctx.clone();
        let mut probes = Vec::with_capacity(self.observers.len());
        for observer in &self.observers {
            let (next, probe) =
                observer.token_issuance_started(&ctx, subject, actor, scope, token_types);
            ctx = next;
            probes.push(probe);
        }
        (ctx, Box::new(CompositeProbe { probes }))
    }
}

struct CompositeProbe {
    probes: Vec<Box<dyn Probe>>,
}

impl Probe for CompositeProbe {
    fn token_type_issuance_started(&mut self, token_type: &TokenType) {
        for probe in &mut self.probes {
            probe.token_type_issuance_started(token_type);
        }
    }

    fn token_type_issuance_succeeded(&mut self, token_type: &TokenType, token: &Token) {
        for probe in &mut self.probes {
            probe.token_type_issuance_succeeded(token_type, token);
        }
    }

    fn token_type_issuance_failed(&mut self, token_type: &TokenType, error: &IssuerError) {
        for probe in &mut self.probes {
            probe.token_type_issuance_failed(token_type, error);
        }
    }

    fn issuer_not_found(&mut self, token_type: &TokenType, error: &RegistryError) {
        for probe in &mut self.probes {
            probe.issuer_not_found(token_type, error);
        }
    }

    fn end(&mut self) {
        for probe in &mut self.probes {
            probe.end();
        }
    }
}
