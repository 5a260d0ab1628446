use super::disconnect::Disconnect;
use crate::domain::ports::LedgerBroadcasterBox;
use crate::domain::steps::{AttestationPayload, AttestationResult, Confirmation};
use crate::domain::transfer::ValidatedTransfer;
use crate::error::{Result, TransferError};
use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Publishes a tamper-evident record of a verified transfer on the external
/// ledger and waits for inclusion.
///
/// Never returns an error: every failure is folded into
/// `AttestationResult::error` so the saga can continue to settlement.
pub struct AttestationBroadcaster {
    ledger: LedgerBroadcasterBox,
    confirmation_timeout: Duration,
    poll_interval: Duration,
}

impl AttestationBroadcaster {
    pub fn new(
        ledger: LedgerBroadcasterBox,
        confirmation_timeout: Duration,
        poll_interval: Duration,
    ) -> Self {
        Self {
            ledger,
            confirmation_timeout,
            poll_interval,
        }
    }

    pub async fn attest(
        &self,
        reference_hash: &str,
        transfer: &ValidatedTransfer,
        timestamp: DateTime<Utc>,
        disconnect: &mut Disconnect,
    ) -> AttestationResult {
        let payload = match build_payload(reference_hash, transfer, timestamp) {
            Ok(payload) => payload,
            Err(e) => return AttestationResult::failed(e.to_string()),
        };

        let tx_reference = match self.ledger.submit(&payload).await {
            Ok(tx_reference) => tx_reference,
            Err(e) => {
                warn!(error = %e, "ledger submission failed");
                return AttestationResult::failed(format!("submission failed: {e}"));
            }
        };
        debug!(tx_reference = %tx_reference, "attestation submitted, awaiting confirmation");

        let confirmation =
            tokio::time::timeout(self.confirmation_timeout, self.await_inclusion(&tx_reference));

        tokio::select! {
            waited = confirmation => match waited {
                Ok(Ok(block)) => {
                    info!(tx_reference = %tx_reference, ?block, "attestation confirmed");
                    AttestationResult::confirmed(tx_reference)
                }
                Ok(Err(e)) => {
                    warn!(tx_reference = %tx_reference, error = %e, "attestation not confirmed");
                    AttestationResult::failed(format!("{e} (submitted as {tx_reference})"))
                }
                Err(_) => {
                    warn!(tx_reference = %tx_reference, "attestation confirmation timed out");
                    AttestationResult::failed(format!(
                        "confirmation timed out after {}s (submitted as {tx_reference})",
                        self.confirmation_timeout.as_secs()
                    ))
                }
            },
            _ = disconnect.wait() => {
                warn!(tx_reference = %tx_reference, "caller disconnected during attestation wait");
                AttestationResult::failed(format!(
                    "caller disconnected before confirmation (submitted as {tx_reference})"
                ))
            }
        }
    }

    async fn await_inclusion(&self, tx_reference: &str) -> Result<Option<u64>> {
        loop {
            match self.ledger.confirmation(tx_reference).await? {
                Confirmation::Confirmed { block } => return Ok(block),
                Confirmation::Dropped(reason) => {
                    return Err(TransferError::AttestationError(format!(
                        "dropped by ledger: {reason}"
                    )));
                }
                Confirmation::Pending => tokio::time::sleep(self.poll_interval).await,
            }
        }
    }
}

/// JSON bytes of `{sender, recipient, amount, timestamp, referenceHash}`.
pub fn build_payload(
    reference_hash: &str,
    transfer: &ValidatedTransfer,
    timestamp: DateTime<Utc>,
) -> Result<Vec<u8>> {
    let payload = AttestationPayload {
        sender: transfer.sender.clone(),
        recipient: transfer.recipient.clone(),
        amount: transfer.amount,
        timestamp: timestamp.timestamp_millis(),
        reference_hash: reference_hash.to_string(),
    };
    Ok(serde_json::to_vec(&payload)?)
}
