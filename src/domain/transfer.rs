use crate::error::{Result, TransferError};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A positive monetary amount, implicitly USD.
///
/// Wraps `rust_decimal::Decimal` so a transfer can never be built with a zero
/// or negative value, or with a fraction of a cent.
const MINOR_UNIT_SCALE: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self> {
        if value <= Decimal::ZERO {
            return Err(TransferError::ValidationError(
                "amount must be positive".to_string(),
            ));
        }
        // Payouts settle in whole cents.
        if value.normalize().scale() > MINOR_UNIT_SCALE {
            return Err(TransferError::ValidationError(format!(
                "amount {value} has more than {MINOR_UNIT_SCALE} decimal places"
            )));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Provider wire format: two decimal places.
    pub fn to_minor_string(&self) -> String {
        format!("{:.2}", self.0)
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = TransferError;

    fn try_from(value: Decimal) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Caller-supplied transfer body exactly as it arrived.
///
/// Every field is optional so a missing one surfaces as a `ValidationError`
/// naming the field rather than as a generic deserialization failure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    pub sender: Option<String>,
    pub recipient: Option<String>,
    pub amount: Option<Decimal>,
    #[serde(alias = "signature")]
    pub authorization: Option<String>,
    #[serde(default)]
    pub attest_on_ledger: bool,
}

/// A request that passed input validation. Only this type enters the saga.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedTransfer {
    pub sender: String,
    pub recipient: String,
    pub amount: Amount,
    pub authorization: String,
    pub attest_on_ledger: bool,
}

fn required(field: &'static str, value: Option<String>) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(TransferError::ValidationError(format!(
            "missing required field `{field}`"
        ))),
    }
}

impl TransferRequest {
    pub fn validate(self) -> Result<ValidatedTransfer> {
        let sender = required("sender", self.sender)?;
        let recipient = required("recipient", self.recipient)?;
        let amount = self.amount.ok_or_else(|| {
            TransferError::ValidationError("missing required field `amount`".to_string())
        })?;
        let amount = Amount::new(amount)?;
        let authorization = required("authorization", self.authorization)?;

        Ok(ValidatedTransfer {
            sender,
            recipient,
            amount,
            authorization,
            attest_on_ledger: self.attest_on_ledger,
        })
    }
}

/// Locally derived terminal classification of an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Completed,
    /// Settled, but a requested attestation did not confirm. Only emitted when
    /// the outcome policy keeps it distinct from `Completed`.
    Partial,
    Failed,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Completed => "completed",
            Outcome::Partial => "partial",
            Outcome::Failed => "failed",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Durable, append-only record of one verified attempt.
///
/// Never carries settlement credentials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRecord {
    pub id: String,
    pub sender: String,
    pub recipient: String,
    pub amount: Amount,
    pub timestamp: DateTime<Utc>,
    pub reference_hash: String,
    pub ledger_tx_reference: Option<String>,
    /// Whether attestation was requested, not whether it succeeded.
    pub attested: bool,
    pub attestation_error: Option<String>,
    pub idempotency_key: Option<String>,
    pub settlement_error: Option<String>,
    pub outcome: Outcome,
}

impl TransferRecord {
    pub fn involves(&self, party: &str) -> bool {
        self.sender == party || self.recipient == party
    }
}
