//! Structured issuance logging
//!
//! Each `issue_tokens` call gets an `issue_tokens` span, parented to the
//! incoming context's span and installed in the returned context so issuer
//! and data source logs nest under it. Every probe event becomes one event
//! under target `tokensmith::issuance`.

use std::time::Instant;

use tracing::{Span, info, info_span, warn};

use super::{Observer, Probe};
use crate::context::RequestContext;
use crate::error::{IssuerError, RegistryError};
use crate::token::{Token, TokenType};
use crate::types::TrustResult;

/// Observer that logs issuance through `tracing`
#[derive(Debug, Clone, Default)]
pub struct TracingObserver {
    trust_domain: Option<String>,
}

impl TracingObserver {
    /// Observer without a trust domain label
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Label every event with the issuing trust domain
    #[must_use]
    pub fn with_trust_domain(mut self, trust_domain: impl Into<String>) -> Self {
        self.trust_domain = Some(trust_domain.into());
        self
    }
}

impl Observer for TracingObserver {
    fn token_issuance_started(
        &self,
        ctx: &RequestContext,
        subject: &TrustResult,
        actor: Option<&TrustResult>,
        scope: &str,
        token_types: &[TokenType],
    ) -> (RequestContext, Box<dyn Probe>) {
        let requested: Vec<&str> = token_types.iter().map(TokenType::as_str).collect();
        let span = info_span!(
            parent: ctx.span(),
            "issue_tokens",
            trust_domain = self.trust_domain.as_deref().unwrap_or(""),
            subject = %subject.subject,
            subject_trust_domain = %subject.trust_domain,
            actor = actor.map(|a| a.subject.as_str()),
            scope = %scope,
            token_types = ?requested,
        );

        info!(
            target: "tokensmith::issuance",
            parent: &span,
            event_type = "issuance_started",
            token_type_count = token_types.len(),
            "Token issuance started"
        );

        let probe = TracingProbe {
            span: span.clone(),
            started: Instant::now(),
            type_started: None,
            issued: 0,
        };
        (ctx.clone().with_span(span), Box::new(probe))
    }
}

#[derive(Debug)]
struct TracingProbe {
    span: Span,
    started: Instant,
    type_started: Option<Instant>,
    issued: usize,
}

impl TracingProbe {
    fn type_elapsed_ms(&mut self) -> u128 {
        self.type_started
            .take()
            .map_or(0, |started| started.elapsed().as_millis())
    }
}

impl Probe for TracingProbe {
    fn token_type_issuance_started(&mut self, token_type: &TokenType) {
        self.type_started = Some(Instant::now());
        info!(
            target: "tokensmith::issuance",
            parent: &self.span,
            event_type = "type_started",
            token_type = %token_type,
            "Issuing token type"
        );
    }

    fn token_type_issuance_succeeded(&mut self, token_type: &TokenType, token: &Token) {
        self.issued += 1;
        let duration_ms = self.type_elapsed_ms();
        info!(
            target: "tokensmith::issuance",
            parent: &self.span,
            event_type = "type_succeeded",
            token_type = %token_type,
            expires_at = %token.expires_at,
            duration_ms,
            "Token issued"
        );
    }

    fn token_type_issuance_failed(&mut self, token_type: &TokenType, error: &IssuerError) {
        let duration_ms = self.type_elapsed_ms();
        warn!(
            target: "tokensmith::issuance",
            parent: &self.span,
            event_type = "type_failed",
            token_type = %token_type,
            interrupted = error.is_interrupted(),
            error = %error,
            duration_ms,
            "Token issuance failed"
        );
    }

    fn issuer_not_found(&mut self, token_type: &TokenType, error: &RegistryError) {
        self.type_started = None;
        warn!(
            target: "tokensmith::issuance",
            parent: &self.span,
            event_type = "issuer_not_found",
            token_type = %token_type,
            error = %error,
            "No issuer for token type"
        );
    }

    fn end(&mut self) {
        info!(
            target: "tokensmith::issuance",
            parent: &self.span,
            event_type = "issuance_ended",
            issued = self.issued,
            duration_ms = self.started.elapsed().as_millis(),
            "Token issuance finished"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RegistryError;

    #[test]
    fn test_probe_accepts_full_lifecycle() {
        let observer = TracingObserver::new().with_trust_domain("example.org");
        let subject = TrustResult::new("alice", "example.org");
        let token_type = TokenType::access_token();

        let (_ctx, mut probe) = observer.token_issuance_started(
            &RequestContext::new(),
            &subject,
            None,
            "",
            std::slice::from_ref(&token_type),
        );
        probe.token_type_issuance_started(&token_type);
        probe.issuer_not_found(&token_type, &RegistryError::NotFound(token_type.clone()));
        probe.end();
    }
}
