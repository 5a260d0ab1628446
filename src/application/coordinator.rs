use super::attestation::AttestationBroadcaster;
use super::disconnect::Disconnect;
use super::observer::NoopObserver;
use super::outcome_ledger::{Attempt, OutcomeLedger};
use super::settlement::SettlementClient;
use super::state::{SagaState, StateTrail};
use super::verification::VerificationGateway;
use crate::domain::events::SagaEvent;
use crate::domain::ports::{PrincipalStoreBox, SagaObserverBox};
use crate::domain::steps::{AttestationResult, SettlementResult, VerificationResult};
use crate::domain::transfer::{Outcome, TransferRecord, TransferRequest};
use crate::error::{Result, TransferError};
use chrono::{DateTime, Utc};
use rand::RngCore;
use tracing::{Instrument, info_span, warn};

/// What the caller learns about a verified attempt, whatever its end state.
#[derive(Debug, Clone)]
pub struct SagaReport {
    pub attempt_id: String,
    pub timestamp: DateTime<Utc>,
    pub reference_hash: String,
    pub attest_requested: bool,
    pub attestation: AttestationResult,
    pub settlement: SettlementResult,
    pub outcome: Outcome,
    pub record: Option<TransferRecord>,
    /// Set when settlement ran but the outcome could not be persisted.
    pub persist_error: Option<String>,
    pub trail: StateTrail,
}

impl SagaReport {
    pub fn is_degraded(&self) -> bool {
        self.persist_error.is_some()
    }
}

/// Sequences verify, optional attest, settle and persist for one request.
///
/// The only component that decides between terminating and continuing:
/// a request that fails before or during verification returns `Err` and
/// leaves no record; every verified request returns a `SagaReport` and
/// reaches the outcome ledger exactly once.
pub struct SettlementSaga {
    principals: PrincipalStoreBox,
    gateway: VerificationGateway,
    attestation: Option<AttestationBroadcaster>,
    settlement: SettlementClient,
    ledger: OutcomeLedger,
    observer: SagaObserverBox,
}

impl SettlementSaga {
    pub fn new(
        principals: PrincipalStoreBox,
        gateway: VerificationGateway,
        attestation: Option<AttestationBroadcaster>,
        settlement: SettlementClient,
        ledger: OutcomeLedger,
    ) -> Self {
        Self {
            principals,
            gateway,
            attestation,
            settlement,
            ledger,
            observer: Box::new(NoopObserver),
        }
    }

    pub fn with_observer(mut self, observer: SagaObserverBox) -> Self {
        self.observer = observer;
        self
    }

    pub async fn execute(
        &self,
        request: TransferRequest,
        disconnect: Disconnect,
    ) -> Result<SagaReport> {
        let attempt_id = new_attempt_id();
        let span = info_span!("transfer", attempt_id = %attempt_id);
        self.run(attempt_id, request, disconnect)
            .instrument(span)
            .await
    }

    /// Persisted records, newest first.
    pub async fn history(&self) -> Result<Vec<TransferRecord>> {
        self.ledger.history().await
    }

    async fn run(
        &self,
        attempt_id: String,
        request: TransferRequest,
        mut disconnect: Disconnect,
    ) -> Result<SagaReport> {
        let mut trail = StateTrail::new();
        let timestamp = Utc::now();

        let transfer = match request.validate() {
            Ok(transfer) => transfer,
            Err(e) => {
                trail.advance(SagaState::Rejected);
                warn!(error = %e, "transfer request rejected");
                return Err(e);
            }
        };

        let credentials = match self.principals.credentials_for(&transfer.sender).await {
            Ok(Some(credentials)) => credentials,
            Ok(None) => {
                trail.advance(SagaState::Rejected);
                warn!(sender = %transfer.sender, "no settlement credentials for sender");
                return Err(TransferError::PrincipalNotFound(transfer.sender));
            }
            Err(e) => {
                trail.advance(SagaState::Rejected);
                warn!(error = %e, "principal lookup failed");
                return Err(TransferError::IdentityError(e.to_string()));
            }
        };

        self.observer.notify(&SagaEvent::Received {
            attempt_id: attempt_id.clone(),
            sender: transfer.sender.clone(),
            recipient: transfer.recipient.clone(),
            amount: transfer.amount,
        });

        trail.advance(SagaState::Verifying);
        let reference_hash = match self.gateway.verify(&transfer).await {
            Ok(VerificationResult::Valid { reference_hash }) => {
                trail.advance(SagaState::Verified);
                self.observer.notify(&SagaEvent::Verified {
                    attempt_id: attempt_id.clone(),
                    reference_hash: reference_hash.clone(),
                });
                reference_hash
            }
            Ok(VerificationResult::Invalid { error }) => {
                trail.advance(SagaState::VerifyFailed);
                self.observer.notify(&SagaEvent::VerificationFailed {
                    attempt_id: attempt_id.clone(),
                    reason: error.clone(),
                });
                return Err(TransferError::VerificationRejected(error));
            }
            Err(e) => {
                trail.advance(SagaState::VerifyFailed);
                self.observer.notify(&SagaEvent::VerificationFailed {
                    attempt_id: attempt_id.clone(),
                    reason: e.to_string(),
                });
                return Err(e);
            }
        };

        // From here on every path reaches the outcome ledger.
        let attestation = if transfer.attest_on_ledger {
            trail.advance(SagaState::Attesting);
            let result = match &self.attestation {
                Some(broadcaster) => {
                    broadcaster
                        .attest(&reference_hash, &transfer, timestamp, &mut disconnect)
                        .await
                }
                None => AttestationResult::unavailable("ledger broadcasting is not configured"),
            };
            match (&result.tx_reference, &result.error) {
                (Some(tx_reference), None) => self.observer.notify(&SagaEvent::Attested {
                    attempt_id: attempt_id.clone(),
                    tx_reference: tx_reference.clone(),
                }),
                (_, error) => self.observer.notify(&SagaEvent::AttestationFailed {
                    attempt_id: attempt_id.clone(),
                    error: error.clone().unwrap_or_else(|| "not confirmed".to_string()),
                }),
            }
            result
        } else {
            self.observer.notify(&SagaEvent::AttestationSkipped {
                attempt_id: attempt_id.clone(),
            });
            AttestationResult::skipped()
        };

        trail.advance(SagaState::Settling);
        let settlement = self
            .settlement
            .settle(
                &transfer.sender,
                &transfer.recipient,
                transfer.amount,
                timestamp,
                &credentials,
            )
            .await;
        match &settlement {
            SettlementResult::Succeeded {
                idempotency_key, ..
            } => {
                trail.advance(SagaState::Settled);
                self.observer.notify(&SagaEvent::Settled {
                    attempt_id: attempt_id.clone(),
                    idempotency_key: idempotency_key.clone(),
                });
                trail.advance(SagaState::RecordingSuccess);
            }
            SettlementResult::Failed { error, .. } => {
                trail.advance(SagaState::SettleFailed);
                self.observer.notify(&SagaEvent::SettlementFailed {
                    attempt_id: attempt_id.clone(),
                    error: error.clone(),
                });
                trail.advance(SagaState::RecordingFailure);
            }
        }

        let attempt = Attempt {
            id: &attempt_id,
            transfer: &transfer,
            timestamp,
            reference_hash: &reference_hash,
            attestation: &attestation,
            settlement: &settlement,
        };
        let (outcome, recorded) = self.ledger.record(&attempt).await;
        let (record, persist_error) = match recorded {
            Ok(record) => {
                self.observer.notify(&SagaEvent::Persisted {
                    attempt_id: attempt_id.clone(),
                    outcome,
                });
                (Some(record), None)
            }
            Err(e) => {
                self.observer.notify(&SagaEvent::PersistFailed {
                    attempt_id: attempt_id.clone(),
                    error: e.to_string(),
                });
                (None, Some(e.to_string()))
            }
        };
        trail.advance(SagaState::Finished);

        Ok(SagaReport {
            attempt_id,
            timestamp,
            reference_hash,
            attest_requested: transfer.attest_on_ledger,
            attestation,
            settlement,
            outcome,
            record,
            persist_error,
            trail,
        })
    }
}

fn new_attempt_id() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
