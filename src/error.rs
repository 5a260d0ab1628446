use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, TransferError>;

#[derive(Error, Debug)]
pub enum TransferError {
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("No settlement credentials registered for sender {0}")]
    PrincipalNotFound(String),
    #[error("Principal store unavailable: {0}")]
    IdentityError(String),
    #[error("Verifier gateway error: {0}")]
    GatewayError(String),
    #[error("Verifier did not respond within {0:?}")]
    GatewayTimeout(Duration),
    #[error("Transaction verification failed: {0}")]
    VerificationRejected(String),
    #[error("Attestation error: {0}")]
    AttestationError(String),
    #[error("Settlement error: {0}")]
    SettlementError(String),
    #[error("Persist error: {0}")]
    PersistError(String),
    #[error("Storage error: {0}")]
    StorageError(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl TransferError {
    /// Name of the saga step this error terminated, as reported to callers.
    pub fn step(&self) -> &'static str {
        match self {
            TransferError::ValidationError(_) | TransferError::PrincipalNotFound(_) => "validate",
            TransferError::IdentityError(_) => "credentials",
            TransferError::GatewayError(_)
            | TransferError::GatewayTimeout(_)
            | TransferError::VerificationRejected(_) => "verify",
            TransferError::AttestationError(_) => "attest",
            TransferError::SettlementError(_) => "settle",
            TransferError::PersistError(_) | TransferError::StorageError(_) => "persist",
            TransferError::ConfigError(_)
            | TransferError::CsvError(_)
            | TransferError::IoError(_)
            | TransferError::JsonError(_) => "internal",
        }
    }
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for TransferError {
    fn from(err: rocksdb::Error) -> Self {
        TransferError::StorageError(err.to_string())
    }
}

/// Failure reported by the external payout provider.
///
/// `payload` holds the provider's diagnostic body verbatim so it can be echoed
/// back to the caller for reconciliation.
#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct ProviderError {
    pub status: Option<u16>,
    pub message: String,
    pub payload: Option<serde_json::Value>,
}

impl ProviderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
            payload: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// True when the provider refused the bearer credential.
    pub fn is_unauthorized(&self) -> bool {
        self.status == Some(401)
    }
}
