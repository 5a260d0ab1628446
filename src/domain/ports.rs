use super::events::SagaEvent;
use super::steps::{
    AccessToken, Confirmation, PayoutItem, ProviderCredentials, VerifierRequest, VerifierResponse,
};
use super::transfer::TransferRecord;
use crate::error::{ProviderError, Result};
use async_trait::async_trait;

/// Synchronous request/response port to the opaque transaction verifier.
///
/// Implementations must not share state between exchanges. Output that does
/// not parse as a `VerifierResponse` is reported as `GatewayError`.
#[async_trait]
pub trait Verifier: Send + Sync {
    async fn exchange(&self, request: &VerifierRequest) -> Result<VerifierResponse>;
}

/// Append-only external ledger used for attestations.
#[async_trait]
pub trait LedgerBroadcaster: Send + Sync {
    /// Submits the payload and returns the ledger's reference token.
    async fn submit(&self, payload: &[u8]) -> Result<String>;
    /// Polls inclusion status of a previous submission once.
    async fn confirmation(&self, tx_reference: &str) -> Result<Confirmation>;
}

#[async_trait]
pub trait PayoutProvider: Send + Sync {
    async fn issue_token(
        &self,
        credentials: &ProviderCredentials,
    ) -> std::result::Result<AccessToken, ProviderError>;

    async fn submit_payout(
        &self,
        access_token: &str,
        item: &PayoutItem,
    ) -> std::result::Result<serde_json::Value, ProviderError>;
}

/// Read-only view of the identity collaborator's per-sender credentials.
#[async_trait]
pub trait PrincipalStore: Send + Sync {
    async fn credentials_for(&self, sender: &str) -> Result<Option<ProviderCredentials>>;
}

/// Durable store of transfer records. There is deliberately no update API.
#[async_trait]
pub trait TransferStore: Send + Sync {
    /// Appends a new record; fails if a record with the same id exists.
    async fn append(&self, record: TransferRecord) -> Result<()>;
    /// All records, newest first.
    async fn list(&self) -> Result<Vec<TransferRecord>>;
}

pub trait SagaObserver: Send + Sync {
    fn notify(&self, event: &SagaEvent);
}

pub type VerifierBox = Box<dyn Verifier>;
pub type LedgerBroadcasterBox = Box<dyn LedgerBroadcaster>;
pub type PayoutProviderBox = Box<dyn PayoutProvider>;
pub type PrincipalStoreBox = Box<dyn PrincipalStore>;
pub type TransferStoreBox = Box<dyn TransferStore>;
pub type SagaObserverBox = Box<dyn SagaObserver>;
