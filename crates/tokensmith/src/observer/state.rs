use std::fmt;

use crate::token::TokenType;

/// Position of a probe in its lifecycle
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ProbeState {
    /// No token type started yet
    #[default]
    Idle,
    /// A token type is being issued
    TypeInFlight(TokenType),
    /// The last token type finished, successfully or not
    Completed,
    /// `End` was reported
    Ended,
}

/// A probe notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeEvent {
    /// `token_type_issuance_started`
    TypeStarted(TokenType),
    /// `token_type_issuance_succeeded`
    TypeSucceeded(TokenType),
    /// `token_type_issuance_failed`
    TypeFailed(TokenType),
    /// `issuer_not_found`
    IssuerNotFound(TokenType),
    /// `end`
    End,
}

impl ProbeEvent {
    /// Token type the event refers to
    #[must_use]
    pub fn token_type(&self) -> Option<&TokenType> {
        match self {
            Self::TypeStarted(t)
            | Self::TypeSucceeded(t)
            | Self::TypeFailed(t)
            | Self::IssuerNotFound(t) => Some(t),
            Self::End => None,
        }
    }
}

impl fmt::Display for ProbeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TypeStarted(t) => write!(f, "TypeStarted({t})"),
            Self::TypeSucceeded(t) => write!(f, "TypeSucceeded({t})"),
            Self::TypeFailed(t) => write!(f, "TypeFailed({t})"),
            Self::IssuerNotFound(t) => write!(f, "IssuerNotFound({t})"),
            Self::End => f.write_str("End"),
        }
    }
}

/// An event that is illegal in the current state
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("illegal probe event {event} in state {state:?}")]
pub struct ProbeTransitionError {
    /// State the probe was in
    pub state: ProbeState,
    /// Offending event
    pub event: ProbeEvent,
}

impl ProbeState {
    /// State after `event`
    ///
    /// # Errors
    ///
    /// Returns [`ProbeTransitionError`] when `event` is not allowed here:
    /// completing a type other than the one in flight, starting a type while
    /// another is in flight, ending with a type in flight or before any type
    /// ran, or any event after `End`.
    pub fn apply(&self, event: &ProbeEvent) -> Result<Self, ProbeTransitionError> {
        let next = match (self, event) {
            (Self::Idle | Self::Completed, ProbeEvent::TypeStarted(t)) => {
                Some(Self::TypeInFlight(t.clone()))
            }
            (
                Self::TypeInFlight(current),
                ProbeEvent::TypeSucceeded(t)
                | ProbeEvent::TypeFailed(t)
                | ProbeEvent::IssuerNotFound(t),
            ) if current == t => Some(Self::Completed),
            (Self::Completed, ProbeEvent::End) => Some(Self::Ended),
            _ => None,
        };

        next.ok_or_else(|| ProbeTransitionError {
            state: self.clone(),
            event: event.clone(),
        })
    }

    /// Whether no further events are allowed
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ended)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn replay(events: &[ProbeEvent]) -> Result<ProbeState, ProbeTransitionError> {
        events
            .iter()
            .try_fold(ProbeState::Idle, |state, event| state.apply(event))
    }

    #[test]
    fn test_successful_sequence() {
        let a = TokenType::new("urn:a");
        let b = TokenType::new("urn:b");
        let state = replay(&[
            ProbeEvent::TypeStarted(a.clone()),
            ProbeEvent::TypeSucceeded(a),
            ProbeEvent::TypeStarted(b.clone()),
            ProbeEvent::TypeFailed(b),
            ProbeEvent::End,
        ])
        .unwrap();
        assert!(state.is_terminal());
    }

    #[test]
    fn test_completion_must_match_in_flight_type() {
        let err = replay(&[
            ProbeEvent::TypeStarted(TokenType::new("urn:a")),
            ProbeEvent::TypeSucceeded(TokenType::new("urn:b")),
        ])
        .unwrap_err();
        assert_eq!(err.state, ProbeState::TypeInFlight(TokenType::new("urn:a")));
    }

    #[test]
    fn test_cannot_start_while_in_flight() {
        let a = TokenType::new("urn:a");
        assert!(replay(&[ProbeEvent::TypeStarted(a.clone()), ProbeEvent::TypeStarted(a)]).is_err());
    }

    #[test]
    fn test_end_requires_completed_state() {
        assert!(replay(&[ProbeEvent::End]).is_err());
        assert!(
            replay(&[
                ProbeEvent::TypeStarted(TokenType::new("urn:a")),
                ProbeEvent::End
            ])
            .is_err()
        );
    }

    #[test]
    fn test_nothing_after_end() {
        let a = TokenType::new("urn:a");
        let err = replay(&[
            ProbeEvent::TypeStarted(a.clone()),
            ProbeEvent::IssuerNotFound(a),
            ProbeEvent::End,
            ProbeEvent::End,
        ])
        .unwrap_err();
        assert_eq!(err.state, ProbeState::Ended);
    }
}
