//! In-memory probe recorder
//!
//! Keeps the full event log of every probe it hands out and replays each
//! event through [`ProbeState::apply`], so tests and conformance checks can
//! assert that an issuance produced a well-formed sequence.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::error;

use super::{Observer, Probe, ProbeEvent, ProbeState, ProbeTransitionError};
use crate::context::RequestContext;
use crate::error::{IssuerError, RegistryError};
use crate::token::{Token, TokenType};
use crate::types::TrustResult;

/// Everything one probe observed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedProbe {
    /// Subject identifier of the request
    pub subject: String,
    /// Actor identifier, if any
    pub actor: Option<String>,
    /// Requested scope
    pub scope: String,
    /// Requested token types
    pub token_types: Vec<TokenType>,
    /// Events in arrival order
    pub events: Vec<ProbeEvent>,
    /// Current state
    pub state: ProbeState,
    /// Illegal transitions, in arrival order
    pub violations: Vec<ProbeTransitionError>,
}

impl RecordedProbe {
    /// Ended cleanly with no illegal transitions
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.violations.is_empty() && self.state.is_terminal()
    }

    fn record(&mut self, event: ProbeEvent) {
        match self.state.apply(&event) {
            Ok(next) => self.state = next,
            Err(violation) => {
                error!(
                    subject = %self.subject,
                    error = %violation,
                    "Probe received an illegal event"
                );
                self.violations.push(violation);
            }
        }
        self.events.push(event);
    }
}

/// Observer that records every probe
#[derive(Debug, Clone, Default)]
pub struct RecordingObserver {
    probes: Arc<Mutex<Vec<Arc<Mutex<RecordedProbe>>>>>,
}

impl RecordingObserver {
    /// Empty recorder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every probe created so far, oldest first
    #[must_use]
    pub fn probes(&self) -> Vec<RecordedProbe> {
        self.probes
            .lock()
            .iter()
            .map(|probe| probe.lock().clone())
            .collect()
    }

    /// Snapshot of the most recent probe
    #[must_use]
    pub fn last(&self) -> Option<RecordedProbe> {
        self.probes.lock().last().map(|probe| probe.lock().clone())
    }

    /// Forget every recorded probe
    pub fn clear(&self) {
        self.probes.lock().clear();
    }
}

impl Observer for RecordingObserver {
    fn token_issuance_started(
        &self,
        ctx: &RequestContext,
        subject: &TrustResult,
        actor: Option<&TrustResult>,
        scope: &str,
        token_types: &[TokenType],
    ) -> (RequestContext, Box<dyn Probe>) {
        let record = Arc::new(Mutex::new(RecordedProbe {
            subject: subject.subject.clone(),
            actor: actor.map(|a| a.subject.clone()),
            scope: scope.to_string(),
            token_types: token_types.to_vec(),
            events: Vec::new(),
            state: ProbeState::Idle,
            violations: Vec::new(),
        }));
        self.probes.lock().push(Arc::clone(&record));
        (ctx.clone(), Box::new(RecordingProbe { record }))
    }
}

struct RecordingProbe {
    record: Arc<Mutex<RecordedProbe>>,
}

impl Probe for RecordingProbe {
    fn token_type_issuance_started(&mut self, token_type: &TokenType) {
        self.record
            .lock()
            .record(ProbeEvent::TypeStarted(token_type.clone()));
    }

    fn token_type_issuance_succeeded(&mut self, token_type: &TokenType, _token: &Token) {
        self.record
            .lock()
            .record(ProbeEvent::TypeSucceeded(token_type.clone()));
    }

    fn token_type_issuance_failed(&mut self, token_type: &TokenType, _error: &IssuerError) {
        self.record
            .lock()
            .record(ProbeEvent::TypeFailed(token_type.clone()));
    }

    fn issuer_not_found(&mut self, token_type: &TokenType, _error: &RegistryError) {
        self.record
            .lock()
            .record(ProbeEvent::IssuerNotFound(token_type.clone()));
    }

    fn end(&mut self) {
        self.record.lock().record(ProbeEvent::End);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_illegal_events_are_recorded_as_violations() {
        let recorder = RecordingObserver::new();
        let (_ctx, mut probe) = recorder.token_issuance_started(
            &RequestContext::new(),
            &TrustResult::new("alice", "example.org"),
            Some(&TrustResult::new("svc", "example.org")),
            "",
            &[],
        );
        probe.end();
        probe.end();

        let recorded = recorder.last().unwrap();
        assert_eq!(recorded.actor.as_deref(), Some("svc"));
        assert_eq!(recorded.events, vec![ProbeEvent::End, ProbeEvent::End]);
        assert_eq!(recorded.violations.len(), 2);
        assert!(!recorded.is_well_formed());
    }

    #[test]
    fn test_clear() {
        let recorder = RecordingObserver::new();
        let _ = recorder.token_issuance_started(
            &RequestContext::new(),
            &TrustResult::new("alice", "example.org"),
            None,
            "",
            &[],
        );
        assert_eq!(recorder.probes().len(), 1);
        recorder.clear();
        assert!(recorder.probes().is_empty());
    }
}
