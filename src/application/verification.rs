use crate::domain::ports::VerifierBox;
use crate::domain::steps::{VerificationResult, VerifierRequest, VerifierResponse};
use crate::domain::transfer::ValidatedTransfer;
use crate::error::{Result, TransferError};
use std::time::Duration;
use tracing::{debug, warn};

/// Invokes the opaque verifier and turns its response into a verdict.
///
/// `Err` means the verifier never rendered a verdict (unreachable, malformed
/// output, timeout). A verdict of `valid:false` is `Ok(Invalid)`.
pub struct VerificationGateway {
    verifier: VerifierBox,
    timeout: Duration,
}

impl VerificationGateway {
    pub fn new(verifier: VerifierBox, timeout: Duration) -> Self {
        Self { verifier, timeout }
    }

    pub async fn verify(&self, transfer: &ValidatedTransfer) -> Result<VerificationResult> {
        let request = VerifierRequest {
            sender: transfer.sender.clone(),
            recipient: transfer.recipient.clone(),
            amount: transfer.amount,
            authorization: transfer.authorization.clone(),
        };

        // Dropping the exchange on timeout is what terminates the verifier.
        let response = match tokio::time::timeout(self.timeout, self.verifier.exchange(&request)).await
        {
            Ok(response) => response?,
            Err(_) => {
                warn!(timeout_ms = self.timeout.as_millis() as u64, "verifier timed out");
                return Err(TransferError::GatewayTimeout(self.timeout));
            }
        };

        debug!(valid = response.valid, "verifier responded");
        interpret(response)
    }
}

fn interpret(response: VerifierResponse) -> Result<VerificationResult> {
    if response.valid {
        match response.reference_hash {
            Some(hash) if !hash.trim().is_empty() => Ok(VerificationResult::Valid {
                reference_hash: hash,
            }),
            _ => Err(TransferError::GatewayError(
                "verifier reported valid without a reference hash".to_string(),
            )),
        }
    } else {
        Ok(VerificationResult::Invalid {
            error: response
                .error
                .filter(|e| !e.trim().is_empty())
                .unwrap_or_else(|| "unspecified".to_string()),
        })
    }
}
