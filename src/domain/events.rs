use super::transfer::{Amount, Outcome};

/// Checkpoints the coordinator reports to its observer.
#[derive(Debug, Clone, PartialEq)]
pub enum SagaEvent {
    Received {
        attempt_id: String,
        sender: String,
        recipient: String,
        amount: Amount,
    },
    Verified {
        attempt_id: String,
        reference_hash: String,
    },
    VerificationFailed {
        attempt_id: String,
        reason: String,
    },
    AttestationSkipped {
        attempt_id: String,
    },
    Attested {
        attempt_id: String,
        tx_reference: String,
    },
    AttestationFailed {
        attempt_id: String,
        error: String,
    },
    Settled {
        attempt_id: String,
        idempotency_key: String,
    },
    SettlementFailed {
        attempt_id: String,
        error: String,
    },
    Persisted {
        attempt_id: String,
        outcome: Outcome,
    },
    PersistFailed {
        attempt_id: String,
        error: String,
    },
}

impl SagaEvent {
    pub fn attempt_id(&self) -> &str {
        match self {
            SagaEvent::Received { attempt_id, .. }
            | SagaEvent::Verified { attempt_id, .. }
            | SagaEvent::VerificationFailed { attempt_id, .. }
            | SagaEvent::AttestationSkipped { attempt_id }
            | SagaEvent::Attested { attempt_id, .. }
            | SagaEvent::AttestationFailed { attempt_id, .. }
            | SagaEvent::Settled { attempt_id, .. }
            | SagaEvent::SettlementFailed { attempt_id, .. }
            | SagaEvent::Persisted { attempt_id, .. }
            | SagaEvent::PersistFailed { attempt_id, .. } => attempt_id,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SagaEvent::Received { .. } => "received",
            SagaEvent::Verified { .. } => "verified",
            SagaEvent::VerificationFailed { .. } => "verification_failed",
            SagaEvent::AttestationSkipped { .. } => "attestation_skipped",
            SagaEvent::Attested { .. } => "attested",
            SagaEvent::AttestationFailed { .. } => "attestation_failed",
            SagaEvent::Settled { .. } => "settled",
            SagaEvent::SettlementFailed { .. } => "settlement_failed",
            SagaEvent::Persisted { .. } => "persisted",
            SagaEvent::PersistFailed { .. } => "persist_failed",
        }
    }
}
