//! Adapters behind the domain ports.

pub mod http_ledger;
pub mod http_payout;
pub mod in_memory;
pub mod process_verifier;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
