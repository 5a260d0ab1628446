use crate::domain::events::SagaEvent;
use crate::domain::ports::SagaObserver;
use tracing::{info, warn};

/// Discards every checkpoint.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl SagaObserver for NoopObserver {
    fn notify(&self, _event: &SagaEvent) {}
}

/// Narrates saga checkpoints through `tracing` under the `saga` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl SagaObserver for TracingObserver {
    fn notify(&self, event: &SagaEvent) {
        let attempt_id = event.attempt_id();
        match event {
            SagaEvent::Received {
                sender,
                recipient,
                amount,
                ..
            } => info!(target: "saga", attempt_id, %sender, %recipient, %amount, "transfer received"),
            SagaEvent::Verified { reference_hash, .. } => {
                info!(target: "saga", attempt_id, %reference_hash, "transfer verified")
            }
            SagaEvent::VerificationFailed { reason, .. } => {
                warn!(target: "saga", attempt_id, %reason, "verification failed")
            }
            SagaEvent::AttestationSkipped { .. } => {
                info!(target: "saga", attempt_id, "attestation not requested")
            }
            SagaEvent::Attested { tx_reference, .. } => {
                info!(target: "saga", attempt_id, %tx_reference, "attestation confirmed")
            }
            SagaEvent::AttestationFailed { error, .. } => {
                warn!(target: "saga", attempt_id, %error, "attestation failed, continuing to settlement")
            }
            SagaEvent::Settled {
                idempotency_key, ..
            } => info!(target: "saga", attempt_id, %idempotency_key, "payout settled"),
            SagaEvent::SettlementFailed { error, .. } => {
                warn!(target: "saga", attempt_id, %error, "payout failed")
            }
            SagaEvent::Persisted { outcome, .. } => {
                info!(target: "saga", attempt_id, %outcome, "outcome persisted")
            }
            SagaEvent::PersistFailed { error, .. } => {
                warn!(target: "saga", attempt_id, %error, "outcome NOT persisted, reconcile manually")
            }
        }
    }
}
