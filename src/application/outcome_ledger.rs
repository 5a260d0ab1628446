use crate::domain::ports::TransferStoreBox;
use crate::domain::steps::{AttestationResult, SettlementResult};
use crate::domain::transfer::{Outcome, TransferRecord, ValidatedTransfer};
use crate::error::{Result, TransferError};
use chrono::{DateTime, Utc};
use tracing::{error, info};

/// Policy for settled transfers whose requested attestation did not confirm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutcomePolicy {
    /// Record them as `completed` (attestation treated as cosmetic) rather
    /// than `partial`.
    pub collapse_partial: bool,
}

impl Default for OutcomePolicy {
    fn default() -> Self {
        Self {
            collapse_partial: true,
        }
    }
}

impl OutcomePolicy {
    pub fn derive(
        &self,
        attest_requested: bool,
        attestation: &AttestationResult,
        settlement: &SettlementResult,
    ) -> Outcome {
        if !settlement.succeeded() {
            return Outcome::Failed;
        }
        if attest_requested && !attestation.is_confirmed() && !self.collapse_partial {
            Outcome::Partial
        } else {
            Outcome::Completed
        }
    }
}

/// Everything the saga collected about one verified attempt.
pub struct Attempt<'a> {
    pub id: &'a str,
    pub transfer: &'a ValidatedTransfer,
    pub timestamp: DateTime<Utc>,
    pub reference_hash: &'a str,
    pub attestation: &'a AttestationResult,
    pub settlement: &'a SettlementResult,
}

/// Sole owner of transfer records: derives the outcome and appends exactly
/// one immutable record per verified attempt.
pub struct OutcomeLedger {
    store: TransferStoreBox,
    policy: OutcomePolicy,
}

impl OutcomeLedger {
    pub fn new(store: TransferStoreBox, policy: OutcomePolicy) -> Self {
        Self { store, policy }
    }

    pub fn build_record(&self, attempt: &Attempt<'_>) -> TransferRecord {
        let outcome = self.policy.derive(
            attempt.transfer.attest_on_ledger,
            attempt.attestation,
            attempt.settlement,
        );
        TransferRecord {
            id: attempt.id.to_string(),
            sender: attempt.transfer.sender.clone(),
            recipient: attempt.transfer.recipient.clone(),
            amount: attempt.transfer.amount,
            timestamp: attempt.timestamp,
            reference_hash: attempt.reference_hash.to_string(),
            ledger_tx_reference: attempt.attestation.tx_reference.clone(),
            attested: attempt.transfer.attest_on_ledger,
            attestation_error: attempt.attestation.error.clone(),
            idempotency_key: attempt.settlement.idempotency_key().map(str::to_string),
            settlement_error: attempt.settlement.error().map(str::to_string),
            outcome,
        }
    }

    /// Derives the outcome and persists the attempt. The outcome is returned
    /// even when the append fails, which is reported as `PersistError`;
    /// nothing here touches the settlement.
    pub async fn record(&self, attempt: &Attempt<'_>) -> (Outcome, Result<TransferRecord>) {
        let record = self.build_record(attempt);
        let outcome = record.outcome;
        match self.store.append(record.clone()).await {
            Ok(()) => {
                info!(id = %record.id, %outcome, "transfer recorded");
                (outcome, Ok(record))
            }
            Err(e) => {
                error!(id = %record.id, %outcome, error = %e, "transfer record not persisted");
                (outcome, Err(TransferError::PersistError(e.to_string())))
            }
        }
    }

    pub async fn history(&self) -> Result<Vec<TransferRecord>> {
        self.store.list().await
    }
}
