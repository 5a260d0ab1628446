//! Per-step results and the messages exchanged with external collaborators.
//!
//! Step results are ephemeral: the coordinator consumes them immediately and
//! only the outcome ledger turns them into a durable record.

use super::transfer::Amount;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};

/// Message sent once to the external verifier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerifierRequest {
    pub sender: String,
    pub recipient: String,
    pub amount: Amount,
    pub authorization: String,
}

/// Raw verdict as the verifier rendered it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifierResponse {
    pub valid: bool,
    #[serde(default, alias = "block_hash")]
    pub reference_hash: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum VerificationResult {
    Valid { reference_hash: String },
    Invalid { error: String },
}

impl VerificationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, VerificationResult::Valid { .. })
    }
}

/// Outcome of the optional ledger attestation.
///
/// `attempted == false` means nothing was submitted; that is distinct from a
/// submission that failed to confirm.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AttestationResult {
    pub attempted: bool,
    pub tx_reference: Option<String>,
    pub error: Option<String>,
}

impl AttestationResult {
    pub fn skipped() -> Self {
        Self::default()
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            attempted: false,
            tx_reference: None,
            error: Some(reason.into()),
        }
    }

    pub fn confirmed(tx_reference: impl Into<String>) -> Self {
        Self {
            attempted: true,
            tx_reference: Some(tx_reference.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            attempted: true,
            tx_reference: None,
            error: Some(error.into()),
        }
    }

    pub fn is_confirmed(&self) -> bool {
        self.attempted && self.error.is_none() && self.tx_reference.is_some()
    }
}

/// Status reported by the ledger for a submitted attestation.
#[derive(Debug, Clone, PartialEq)]
pub enum Confirmation {
    Pending,
    Confirmed { block: Option<u64> },
    Dropped(String),
}

/// Payload bytes published on the ledger.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttestationPayload {
    pub sender: String,
    pub recipient: String,
    pub amount: Amount,
    pub timestamp: i64,
    pub reference_hash: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SettlementResult {
    Succeeded {
        idempotency_key: String,
        provider_response: serde_json::Value,
    },
    Failed {
        idempotency_key: Option<String>,
        error: String,
        provider_payload: Option<serde_json::Value>,
    },
}

impl SettlementResult {
    pub fn succeeded(&self) -> bool {
        matches!(self, SettlementResult::Succeeded { .. })
    }

    pub fn idempotency_key(&self) -> Option<&str> {
        match self {
            SettlementResult::Succeeded {
                idempotency_key, ..
            } => Some(idempotency_key),
            SettlementResult::Failed {
                idempotency_key, ..
            } => idempotency_key.as_deref(),
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            SettlementResult::Succeeded { .. } => None,
            SettlementResult::Failed { error, .. } => Some(error),
        }
    }
}

/// Settlement-provider client credentials for one principal.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct ProviderCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl ProviderCredentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }
}

impl fmt::Debug for ProviderCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Short-lived bearer credential issued by the payout provider.
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: String,
    pub expires_in: Duration,
    pub issued_at: Instant,
}

/// A single payout item submitted to the provider.
#[derive(Debug, Clone, PartialEq)]
pub struct PayoutItem {
    pub recipient: String,
    pub amount: Amount,
    pub currency: String,
    pub idempotency_key: String,
}
