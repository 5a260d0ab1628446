use std::fmt;

/// Lifecycle of one transfer attempt inside the coordinator.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SagaState {
    Received,
    /// Input or principal lookup refused before any external call.
    Rejected,
    Verifying,
    VerifyFailed,
    Verified,
    Attesting,
    Settling,
    SettleFailed,
    Settled,
    RecordingFailure,
    RecordingSuccess,
    Finished,
}

const VALID_TRANSITIONS: &[(SagaState, SagaState)] = &[
    (SagaState::Received, SagaState::Rejected),
    (SagaState::Received, SagaState::Verifying),
    (SagaState::Verifying, SagaState::VerifyFailed),
    (SagaState::Verifying, SagaState::Verified),
    (SagaState::Verified, SagaState::Attesting),
    (SagaState::Verified, SagaState::Settling),
    (SagaState::Attesting, SagaState::Settling),
    (SagaState::Settling, SagaState::SettleFailed),
    (SagaState::Settling, SagaState::Settled),
    (SagaState::SettleFailed, SagaState::RecordingFailure),
    (SagaState::Settled, SagaState::RecordingSuccess),
    (SagaState::RecordingFailure, SagaState::Finished),
    (SagaState::RecordingSuccess, SagaState::Finished),
];

impl SagaState {
    pub fn can_transition_to(self, next: SagaState) -> bool {
        VALID_TRANSITIONS.contains(&(self, next))
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SagaState::Rejected | SagaState::VerifyFailed | SagaState::Finished
        )
    }
}

impl fmt::Display for SagaState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SagaState::Received => "RECEIVED",
            SagaState::Rejected => "REJECTED",
            SagaState::Verifying => "VERIFYING",
            SagaState::VerifyFailed => "VERIFY_FAILED",
            SagaState::Verified => "VERIFIED",
            SagaState::Attesting => "ATTESTING",
            SagaState::Settling => "SETTLING",
            SagaState::SettleFailed => "SETTLE_FAILED",
            SagaState::Settled => "SETTLED",
            SagaState::RecordingFailure => "RECORDING_FAILURE",
            SagaState::RecordingSuccess => "RECORDING_SUCCESS",
            SagaState::Finished => "FINISHED",
        };
        f.write_str(name)
    }
}

/// The ordered states one attempt has passed through.
#[derive(Debug, Clone, PartialEq)]
pub struct StateTrail {
    states: Vec<SagaState>,
}

impl Default for StateTrail {
    fn default() -> Self {
        Self::new()
    }
}

impl StateTrail {
    pub fn new() -> Self {
        Self {
            states: vec![SagaState::Received],
        }
    }

    pub fn current(&self) -> SagaState {
        self.states
            .last()
            .copied()
            .unwrap_or(SagaState::Received)
    }

    /// Records a transition. Edges outside the table indicate a coordinator
    /// bug; they are logged and still recorded so the trail stays truthful.
    pub fn advance(&mut self, next: SagaState) {
        let current = self.current();
        if !current.can_transition_to(next) {
            tracing::error!(from = %current, to = %next, "invalid saga transition");
        } else {
            tracing::trace!(from = %current, to = %next, "saga transition");
        }
        self.states.push(next);
    }

    pub fn states(&self) -> &[SagaState] {
        &self.states
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_transitions() {
        assert!(SagaState::Received.can_transition_to(SagaState::Verifying));
        assert!(SagaState::Verified.can_transition_to(SagaState::Settling));
        assert!(SagaState::SettleFailed.can_transition_to(SagaState::RecordingFailure));
    }

    #[test]
    fn test_invalid_transitions() {
        assert!(!SagaState::VerifyFailed.can_transition_to(SagaState::Settling));
        assert!(!SagaState::Settling.can_transition_to(SagaState::Attesting));
        assert!(!SagaState::Finished.can_transition_to(SagaState::Received));
        assert!(!SagaState::SettleFailed.can_transition_to(SagaState::RecordingSuccess));
    }

    #[test]
    fn test_terminal_states() {
        assert!(SagaState::Rejected.is_terminal());
        assert!(SagaState::VerifyFailed.is_terminal());
        assert!(SagaState::Finished.is_terminal());
        assert!(!SagaState::Settled.is_terminal());
    }

    #[test]
    fn test_trail_records_path() {
        let mut trail = StateTrail::new();
        trail.advance(SagaState::Verifying);
        trail.advance(SagaState::Verified);
        assert_eq!(trail.current(), SagaState::Verified);
        assert_eq!(trail.states().len(), 3);
    }
}
