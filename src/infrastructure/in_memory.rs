use crate::domain::ports::{PrincipalStore, TransferStore};
use crate::domain::steps::ProviderCredentials;
use crate::domain::transfer::TransferRecord;
use crate::error::{Result, TransferError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe, append-only in-memory store of transfer records.
///
/// Records are kept in insertion order; `list` returns them newest first.
/// Cloning shares the underlying storage.
#[derive(Default, Clone)]
pub struct InMemoryTransferStore {
    records: Arc<RwLock<Vec<TransferRecord>>>,
}

impl InMemoryTransferStore {
    /// Creates a new, empty in-memory transfer store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TransferStore for InMemoryTransferStore {
    async fn append(&self, record: TransferRecord) -> Result<()> {
        let mut records = self.records.write().await;
        if records.iter().any(|r| r.id == record.id) {
            return Err(TransferError::StorageError(format!(
                "transfer record {} already exists",
                record.id
            )));
        }
        records.push(record);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<TransferRecord>> {
        let records = self.records.read().await;
        Ok(records.iter().rev().cloned().collect())
    }
}

/// Per-sender settlement credentials held in memory.
///
/// An optional fallback entry serves senders without their own credentials,
/// which models a single set of global provider credentials.
#[derive(Default, Clone)]
pub struct InMemoryPrincipalStore {
    principals: Arc<HashMap<String, ProviderCredentials>>,
    fallback: Option<ProviderCredentials>,
}

impl InMemoryPrincipalStore {
    pub fn new(principals: HashMap<String, ProviderCredentials>) -> Self {
        Self {
            principals: Arc::new(principals),
            fallback: None,
        }
    }

    /// A store in which every sender shares one credential set.
    pub fn shared(credentials: ProviderCredentials) -> Self {
        Self::default().with_fallback(credentials)
    }

    pub fn with_fallback(mut self, credentials: ProviderCredentials) -> Self {
        self.fallback = Some(credentials);
        self
    }

    pub fn len(&self) -> usize {
        self.principals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.principals.is_empty() && self.fallback.is_none()
    }
}

#[async_trait]
impl PrincipalStore for InMemoryPrincipalStore {
    async fn credentials_for(&self, sender: &str) -> Result<Option<ProviderCredentials>> {
        Ok(self
            .principals
            .get(sender)
            .or(self.fallback.as_ref())
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::transfer::{Amount, Outcome};
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn record(id: &str) -> TransferRecord {
        TransferRecord {
            id: id.to_string(),
            sender: "a@x.com".into(),
            recipient: "b@x.com".into(),
            amount: Amount::new(dec!(10)).unwrap(),
            timestamp: Utc::now(),
            reference_hash: "h1".into(),
            ledger_tx_reference: None,
            attested: false,
            attestation_error: None,
            idempotency_key: Some("k".into()),
            settlement_error: None,
            outcome: Outcome::Completed,
        }
    }

    #[tokio::test]
    async fn test_in_memory_transfer_store_newest_first() {
        let store = InMemoryTransferStore::new();
        store.append(record("1")).await.unwrap();
        store.append(record("2")).await.unwrap();

        let ids: Vec<String> = store.list().await.unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["2".to_string(), "1".to_string()]);
    }

    #[tokio::test]
    async fn test_in_memory_transfer_store_rejects_duplicate() {
        let store = InMemoryTransferStore::new();
        store.append(record("1")).await.unwrap();
        assert!(matches!(
            store.append(record("1")).await,
            Err(TransferError::StorageError(_))
        ));
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_principal_lookup_and_fallback() {
        let mut map = HashMap::new();
        map.insert("a@x.com".to_string(), ProviderCredentials::new("id-a", "s-a"));
        let store = InMemoryPrincipalStore::new(map);

        let creds = store.credentials_for("a@x.com").await.unwrap().unwrap();
        assert_eq!(creds.client_id, "id-a");
        assert!(store.credentials_for("z@x.com").await.unwrap().is_none());

        let store = store.with_fallback(ProviderCredentials::new("global", "g"));
        let creds = store.credentials_for("z@x.com").await.unwrap().unwrap();
        assert_eq!(creds.client_id, "global");
        let creds = store.credentials_for("a@x.com").await.unwrap().unwrap();
        assert_eq!(creds.client_id, "id-a");
    }
}
