use crate::domain::steps::ProviderCredentials;
use crate::error::{Result, TransferError};
use serde::Deserialize;
use std::collections::HashMap;
use std::io::Read;

#[derive(Debug, Deserialize)]
struct PrincipalRow {
    sender: String,
    client_id: String,
    client_secret: String,
}

/// Reads per-sender settlement credentials from a CSV source with the header
/// `sender,client_id,client_secret`.
pub struct PrincipalReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> PrincipalReader<R> {
    /// Creates a new `PrincipalReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(source);
        Self { reader }
    }

    /// Loads every row into a map keyed by sender.
    ///
    /// Unlike a transaction stream, a credentials file is all-or-nothing: a
    /// malformed row, an empty field or a repeated sender fails the load.
    pub fn load(self) -> Result<HashMap<String, ProviderCredentials>> {
        let mut principals = HashMap::new();
        for row in self.reader.into_deserialize::<PrincipalRow>() {
            let row = row?;
            if row.sender.is_empty() || row.client_id.is_empty() || row.client_secret.is_empty() {
                return Err(TransferError::ConfigError(format!(
                    "incomplete credentials for sender `{}`",
                    row.sender
                )));
            }
            let credentials = ProviderCredentials::new(row.client_id, row.client_secret);
            if principals.insert(row.sender.clone(), credentials).is_some() {
                return Err(TransferError::ConfigError(format!(
                    "duplicate credentials for sender `{}`",
                    row.sender
                )));
            }
        }
        Ok(principals)
    }
}
