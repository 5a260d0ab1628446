use crate::domain::ports::LedgerBroadcaster;
use crate::domain::steps::Confirmation;
use crate::error::{Result, TransferError};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Talks to a ledger broadcast gateway over HTTP.
///
/// The gateway owns signing and RPC to the underlying network; this adapter
/// only submits opaque payload bytes and reads back inclusion status.
#[derive(Debug, Clone)]
pub struct HttpLedgerBroadcaster {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmitResponse {
    tx_reference: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusResponse {
    status: String,
    #[serde(default)]
    block_number: Option<u64>,
    #[serde(default)]
    error: Option<String>,
}

impl HttpLedgerBroadcaster {
    pub fn new(base_url: impl Into<String>, request_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| TransferError::ConfigError(format!("ledger http client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

fn ledger_error(context: &str, e: impl std::fmt::Display) -> TransferError {
    TransferError::AttestationError(format!("{context}: {e}"))
}

#[async_trait]
impl LedgerBroadcaster for HttpLedgerBroadcaster {
    async fn submit(&self, payload: &[u8]) -> Result<String> {
        let url = format!("{}/transactions", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "data": format!("0x{}", hex::encode(payload)) }))
            .send()
            .await
            .map_err(|e| ledger_error("ledger unreachable", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ledger_error(
                "ledger rejected submission",
                format!("{status} {body}"),
            ));
        }

        let body: SubmitResponse = response
            .json()
            .await
            .map_err(|e| ledger_error("malformed ledger response", e))?;
        debug!(tx_reference = %body.tx_reference, "ledger accepted submission");
        Ok(body.tx_reference)
    }

    async fn confirmation(&self, tx_reference: &str) -> Result<Confirmation> {
        let url = format!("{}/transactions/{}", self.base_url, tx_reference);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ledger_error("ledger unreachable", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ledger_error("ledger status query failed", status));
        }

        let body: StatusResponse = response
            .json()
            .await
            .map_err(|e| ledger_error("malformed ledger status", e))?;
        Ok(match body.status.as_str() {
            "confirmed" => Confirmation::Confirmed {
                block: body.block_number,
            },
            "dropped" | "failed" => {
                Confirmation::Dropped(body.error.unwrap_or_else(|| body.status.clone()))
            }
            _ => Confirmation::Pending,
        })
    }
}
