use crate::domain::ports::TransferStore;
use crate::domain::transfer::TransferRecord;
use crate::error::{Result, TransferError};
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options, WriteBatch};
use std::path::Path;
use std::sync::Arc;

/// Column Family holding transfer records, keyed by creation time.
pub const CF_TRANSFERS: &str = "transfers";
/// Column Family mapping a record id to its key in `CF_TRANSFERS`.
pub const CF_TRANSFER_IDS: &str = "transfer_ids";

/// A persistent, append-only transfer store using RocksDB.
///
/// Record keys are the big-endian creation timestamp (nanoseconds) followed by
/// the record id, so iterating from the end yields the newest record first.
/// Record and id index are written in one batch.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_transfers = ColumnFamilyDescriptor::new(CF_TRANSFERS, Options::default());
        let cf_ids = ColumnFamilyDescriptor::new(CF_TRANSFER_IDS, Options::default());

        let db = DB::open_cf_descriptors(&opts, path, vec![cf_transfers, cf_ids])?;

        Ok(Self { db: Arc::new(db) })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| TransferError::StorageError(format!("{name} column family not found")))
    }
}

fn record_key(record: &TransferRecord) -> Vec<u8> {
    let nanos = record
        .timestamp
        .timestamp_nanos_opt()
        .unwrap_or_default()
        .max(0) as u64;
    let mut key = nanos.to_be_bytes().to_vec();
    key.extend_from_slice(record.id.as_bytes());
    key
}

#[async_trait]
impl TransferStore for RocksDBStore {
    async fn append(&self, record: TransferRecord) -> Result<()> {
        let cf_transfers = self.cf(CF_TRANSFERS)?;
        let cf_ids = self.cf(CF_TRANSFER_IDS)?;

        if self.db.get_pinned_cf(cf_ids, record.id.as_bytes())?.is_some() {
            return Err(TransferError::StorageError(format!(
                "transfer record {} already exists",
                record.id
            )));
        }

        let key = record_key(&record);
        let value = serde_json::to_vec(&record)?;

        let mut batch = WriteBatch::default();
        batch.put_cf(cf_transfers, &key, value);
        batch.put_cf(cf_ids, record.id.as_bytes(), &key);
        self.db.write(batch)?;

        Ok(())
    }

    async fn list(&self) -> Result<Vec<TransferRecord>> {
        let cf = self.cf(CF_TRANSFERS)?;

        let mut records = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::End) {
            let (_key, value) = item?;
            let record: TransferRecord = serde_json::from_slice(&value).map_err(|e| {
                TransferError::StorageError(format!("Failed to deserialize transfer: {e}"))
            })?;
            records.push(record);
        }

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::transfer::{Amount, Outcome};
    use chrono::{Duration, Utc};
    use rust_decimal_macros::dec;
    use tempfile::tempdir;

    fn record(id: &str, age_secs: i64) -> TransferRecord {
        TransferRecord {
            id: id.to_string(),
            sender: "a@x.com".into(),
            recipient: "b@x.com".into(),
            amount: Amount::new(dec!(10)).unwrap(),
            timestamp: Utc::now() - Duration::seconds(age_secs),
            reference_hash: "h1".into(),
            ledger_tx_reference: Some("0xabc".into()),
            attested: true,
            attestation_error: None,
            idempotency_key: Some("k".into()),
            settlement_error: None,
            outcome: Outcome::Completed,
        }
    }

    #[tokio::test]
    async fn test_rocksdb_open_cf() {
        let dir = tempdir().unwrap();
        let store = RocksDBStore::open(dir.path()).expect("Failed to open RocksDB");

        assert!(store.db.cf_handle(CF_TRANSFERS).is_some());
        assert!(store.db.cf_handle(CF_TRANSFER_IDS).is_some());
    }

    #[tokio::test]
    async fn test_rocksdb_lists_newest_first() {
        let dir = tempdir().unwrap();
        let store = RocksDBStore::open(dir.path()).unwrap();

        store.append(record("old", 60)).await.unwrap();
        store.append(record("new", 0)).await.unwrap();
        store.append(record("mid", 30)).await.unwrap();

        let ids: Vec<String> = store.list().await.unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["new", "mid", "old"]);
    }

    #[tokio::test]
    async fn test_rocksdb_rejects_duplicate_id() {
        let dir = tempdir().unwrap();
        let store = RocksDBStore::open(dir.path()).unwrap();

        store.append(record("1", 0)).await.unwrap();
        assert!(store.append(record("1", 5)).await.is_err());
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_rocksdb_survives_reopen() {
        let dir = tempdir().unwrap();
        {
            let store = RocksDBStore::open(dir.path()).unwrap();
            store.append(record("1", 0)).await.unwrap();
        }
        let store = RocksDBStore::open(dir.path()).unwrap();
        let records = store.list().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].ledger_tx_reference.as_deref(), Some("0xabc"));
    }
}
