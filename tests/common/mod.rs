#![allow(dead_code)]

use async_trait::async_trait;
use payout_saga::application::attestation::AttestationBroadcaster;
use payout_saga::application::coordinator::SettlementSaga;
use payout_saga::application::outcome_ledger::{OutcomeLedger, OutcomePolicy};
use payout_saga::application::settlement::SettlementClient;
use payout_saga::application::verification::VerificationGateway;
use payout_saga::domain::events::SagaEvent;
use payout_saga::domain::ports::{
    LedgerBroadcaster, PayoutProvider, SagaObserver, TransferStore, Verifier,
};
use payout_saga::domain::steps::{
    AccessToken, Confirmation, PayoutItem, ProviderCredentials, VerifierRequest, VerifierResponse,
};
use payout_saga::domain::transfer::{TransferRecord, TransferRequest};
use payout_saga::error::{ProviderError, Result, TransferError};
use payout_saga::infrastructure::in_memory::{InMemoryPrincipalStore, InMemoryTransferStore};
use rust_decimal::Decimal;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

pub const SENDER: &str = "alice@example.com";
pub const RECIPIENT: &str = "bob@example.com";

pub fn request(amount: Decimal, attest: bool) -> TransferRequest {
    TransferRequest {
        sender: Some(SENDER.to_string()),
        recipient: Some(RECIPIENT.to_string()),
        amount: Some(amount),
        authorization: Some("sig-1".to_string()),
        attest_on_ledger: attest,
    }
}

#[derive(Clone)]
enum Reply {
    Verdict(VerifierResponse),
    Unreachable(String),
    Silent,
}

/// Answers every exchange the same way and counts the calls.
#[derive(Clone)]
pub struct CountingVerifier {
    pub calls: Arc<AtomicUsize>,
    reply: Reply,
}

impl CountingVerifier {
    fn with_reply(reply: Reply) -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            reply,
        }
    }

    pub fn valid(reference_hash: &str) -> Self {
        Self::with_reply(Reply::Verdict(VerifierResponse {
            valid: true,
            reference_hash: Some(reference_hash.to_string()),
            error: None,
        }))
    }

    pub fn invalid(error: &str) -> Self {
        Self::with_reply(Reply::Verdict(VerifierResponse {
            valid: false,
            reference_hash: None,
            error: Some(error.to_string()),
        }))
    }

    /// Fails every exchange as if the verifier could not be reached.
    pub fn unreachable(error: &str) -> Self {
        Self::with_reply(Reply::Unreachable(error.to_string()))
    }

    /// Never answers.
    pub fn silent() -> Self {
        Self::with_reply(Reply::Silent)
    }

    pub fn count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Verifier for CountingVerifier {
    async fn exchange(&self, _request: &VerifierRequest) -> Result<VerifierResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.reply {
            Reply::Verdict(response) => Ok(response.clone()),
            Reply::Unreachable(error) => Err(TransferError::GatewayError(error.clone())),
            Reply::Silent => std::future::pending().await,
        }
    }
}

/// A ledger that either refuses submissions or confirms on the first poll.
#[derive(Clone)]
pub struct ScriptedLedger {
    pub submissions: Arc<AtomicUsize>,
    submit_error: Option<String>,
    status: Confirmation,
}

impl ScriptedLedger {
    pub fn confirming() -> Self {
        Self {
            submissions: Arc::new(AtomicUsize::new(0)),
            submit_error: None,
            status: Confirmation::Confirmed { block: Some(1) },
        }
    }

    pub fn refusing(error: &str) -> Self {
        Self {
            submissions: Arc::new(AtomicUsize::new(0)),
            submit_error: Some(error.to_string()),
            status: Confirmation::Pending,
        }
    }

    pub fn never_confirming() -> Self {
        Self {
            submissions: Arc::new(AtomicUsize::new(0)),
            submit_error: None,
            status: Confirmation::Pending,
        }
    }
}

#[async_trait]
impl LedgerBroadcaster for ScriptedLedger {
    async fn submit(&self, _payload: &[u8]) -> Result<String> {
        self.submissions.fetch_add(1, Ordering::SeqCst);
        match &self.submit_error {
            Some(e) => Err(TransferError::AttestationError(e.clone())),
            None => Ok("0xfeed".to_string()),
        }
    }

    async fn confirmation(&self, _tx_reference: &str) -> Result<Confirmation> {
        Ok(self.status.clone())
    }
}

/// Issues tokens freely and answers payouts with a fixed outcome, keeping the
/// submitted items for inspection.
#[derive(Clone)]
pub struct ScriptedProvider {
    pub tokens_issued: Arc<AtomicUsize>,
    pub payouts: Arc<Mutex<Vec<PayoutItem>>>,
    failure: Option<(u16, Value)>,
}

impl ScriptedProvider {
    pub fn accepting() -> Self {
        Self {
            tokens_issued: Arc::new(AtomicUsize::new(0)),
            payouts: Arc::new(Mutex::new(Vec::new())),
            failure: None,
        }
    }

    pub fn rejecting(status: u16, payload: Value) -> Self {
        Self {
            failure: Some((status, payload)),
            ..Self::accepting()
        }
    }

    pub fn payout_count(&self) -> usize {
        self.payouts.lock().unwrap().len()
    }

    pub fn keys(&self) -> Vec<String> {
        self.payouts
            .lock()
            .unwrap()
            .iter()
            .map(|p| p.idempotency_key.clone())
            .collect()
    }
}

#[async_trait]
impl PayoutProvider for ScriptedProvider {
    async fn issue_token(
        &self,
        _credentials: &ProviderCredentials,
    ) -> std::result::Result<AccessToken, ProviderError> {
        self.tokens_issued.fetch_add(1, Ordering::SeqCst);
        Ok(AccessToken {
            token: "tok".to_string(),
            expires_in: Duration::from_secs(3600),
            issued_at: Instant::now(),
        })
    }

    async fn submit_payout(
        &self,
        _access_token: &str,
        item: &PayoutItem,
    ) -> std::result::Result<Value, ProviderError> {
        self.payouts.lock().unwrap().push(item.clone());
        match &self.failure {
            Some((status, payload)) => Err(ProviderError::new("payout rejected")
                .with_status(*status)
                .with_payload(payload.clone())),
            None => Ok(json!({
                "batch_header": {
                    "payout_batch_id": "BATCH-1",
                    "batch_status": "PENDING",
                }
            })),
        }
    }
}

/// Collects every checkpoint the saga reports.
#[derive(Clone, Default)]
pub struct RecordingObserver {
    pub events: Arc<Mutex<Vec<SagaEvent>>>,
}

impl RecordingObserver {
    pub fn names(&self) -> Vec<&'static str> {
        self.events.lock().unwrap().iter().map(|e| e.name()).collect()
    }
}

impl SagaObserver for RecordingObserver {
    fn notify(&self, event: &SagaEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

/// A transfer store whose every append fails.
pub struct FailingStore;

#[async_trait]
impl TransferStore for FailingStore {
    async fn append(&self, _record: TransferRecord) -> Result<()> {
        Err(TransferError::StorageError("disk full".to_string()))
    }

    async fn list(&self) -> Result<Vec<TransferRecord>> {
        Ok(Vec::new())
    }
}

/// Wires a saga out of fakes. Fields left at their defaults give a verifier
/// that accepts, no ledger, a provider that accepts and an in-memory store.
pub struct SagaBuilder {
    pub verifier: CountingVerifier,
    pub ledger: Option<ScriptedLedger>,
    pub provider: ScriptedProvider,
    pub store: Option<Box<dyn TransferStore>>,
    pub policy: OutcomePolicy,
    pub observer: RecordingObserver,
    pub principals: HashMap<String, ProviderCredentials>,
    pub confirmation_timeout: Duration,
    pub verifier_timeout: Duration,
}

impl Default for SagaBuilder {
    fn default() -> Self {
        let mut principals = HashMap::new();
        principals.insert(
            SENDER.to_string(),
            ProviderCredentials::new("client-alice", "secret-alice"),
        );
        Self {
            verifier: CountingVerifier::valid("hash-1"),
            ledger: None,
            provider: ScriptedProvider::accepting(),
            store: None,
            policy: OutcomePolicy::default(),
            observer: RecordingObserver::default(),
            principals,
            confirmation_timeout: Duration::from_secs(2),
            verifier_timeout: Duration::from_secs(5),
        }
    }
}

impl SagaBuilder {
    /// Returns the saga together with a handle on its in-memory store.
    pub fn build(self) -> (SettlementSaga, InMemoryTransferStore) {
        let records = InMemoryTransferStore::new();
        let store: Box<dyn TransferStore> = match self.store {
            Some(store) => store,
            None => Box::new(records.clone()),
        };
        let attestation = self.ledger.map(|ledger| {
            AttestationBroadcaster::new(
                Box::new(ledger),
                self.confirmation_timeout,
                Duration::from_millis(5),
            )
        });
        let saga = SettlementSaga::new(
            Box::new(InMemoryPrincipalStore::new(self.principals)),
            VerificationGateway::new(Box::new(self.verifier), self.verifier_timeout),
            attestation,
            SettlementClient::new(Box::new(self.provider), "USD"),
            OutcomeLedger::new(store, self.policy),
        )
        .with_observer(Box::new(self.observer));
        (saga, records)
    }
}
