use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::io::Write;
use std::process::Command;

#[test]
fn test_cli_help_lists_subcommands() {
    let mut cmd = Command::new(cargo_bin!("payout-saga"));
    cmd.arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("export"));
}

#[test]
fn test_export_writes_csv_header() {
    let mut cmd = Command::new(cargo_bin!("payout-saga"));
    cmd.arg("export").env_remove("RUST_LOG");

    cmd.assert().success().stdout(predicate::str::starts_with(
        "id,timestamp,sender,recipient,amount,reference_hash,ledger_tx_reference,attested,outcome,idempotency_key,attestation_error,settlement_error",
    ));
}

#[test]
fn test_invalid_config_file_fails() {
    let mut config = tempfile::NamedTempFile::new().unwrap();
    writeln!(config, "listen = 42").unwrap();

    let mut cmd = Command::new(cargo_bin!("payout-saga"));
    cmd.arg("export").arg("--config").arg(config.path());

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Configuration error"));
}

#[cfg(not(feature = "storage-rocksdb"))]
#[test]
fn test_rocksdb_fallback_warning() {
    let mut cmd = Command::new(cargo_bin!("payout-saga"));
    cmd.arg("export")
        .arg("--db-path")
        .arg("some_db")
        .env_remove("RUST_LOG");

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."));
}

#[cfg(feature = "storage-rocksdb")]
#[test]
fn test_rocksdb_export_after_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("transfers_db");

    let mut cmd = Command::new(cargo_bin!("payout-saga"));
    cmd.arg("export").arg("--db-path").arg(&db_path);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("id,timestamp"))
        .stderr(predicate::str::contains("WARNING").not());
}
