use crate::domain::ports::PayoutProvider;
use crate::domain::steps::{AccessToken, PayoutItem, ProviderCredentials};
use crate::error::{ProviderError, Result, TransferError};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing::debug;

const TOKEN_PATH: &str = "/v1/oauth2/token";
const PAYOUTS_PATH: &str = "/v1/payments/payouts";

/// PayPal-style payouts API client.
///
/// Shares one pooled `reqwest::Client` across all requests and credential sets.
#[derive(Debug, Clone)]
pub struct HttpPayoutProvider {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    300
}

impl HttpPayoutProvider {
    pub fn new(base_url: impl Into<String>, request_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| TransferError::ConfigError(format!("payout http client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

/// Builds the batch body for a single payout item.
pub fn payout_body(item: &PayoutItem) -> serde_json::Value {
    serde_json::json!({
        "sender_batch_header": {
            "sender_batch_id": item.idempotency_key,
            "email_subject": "You've received a payment",
        },
        "items": [{
            "recipient_type": "EMAIL",
            "amount": {
                "value": item.amount.to_minor_string(),
                "currency": item.currency,
            },
            "receiver": item.recipient,
            "note": "Payout via verified transfer",
            "sender_item_id": item.idempotency_key,
        }],
    })
}

/// Turns a non-success response into a `ProviderError` carrying the body
/// verbatim: parsed JSON when possible, otherwise the raw text.
async fn provider_failure(context: &str, response: reqwest::Response) -> ProviderError {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    let payload = serde_json::from_str::<serde_json::Value>(&text)
        .unwrap_or(serde_json::Value::String(text));
    ProviderError::new(format!("{context}: provider returned {status}"))
        .with_status(status.as_u16())
        .with_payload(payload)
}

fn transport_failure(context: &str, e: reqwest::Error) -> ProviderError {
    let err = ProviderError::new(format!("{context}: {e}"));
    match e.status() {
        Some(status) => err.with_status(status.as_u16()),
        None => err,
    }
}

#[async_trait]
impl PayoutProvider for HttpPayoutProvider {
    async fn issue_token(
        &self,
        credentials: &ProviderCredentials,
    ) -> std::result::Result<AccessToken, ProviderError> {
        let url = format!("{}{}", self.base_url, TOKEN_PATH);
        let issued_at = Instant::now();
        let response = self
            .client
            .post(&url)
            .basic_auth(&credentials.client_id, Some(&credentials.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| transport_failure("token request failed", e))?;

        if !response.status().is_success() {
            return Err(provider_failure("token request rejected", response).await);
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| transport_failure("malformed token response", e))?;
        debug!(expires_in = body.expires_in, "provider issued access token");
        Ok(AccessToken {
            token: body.access_token,
            expires_in: Duration::from_secs(body.expires_in),
            issued_at,
        })
    }

    async fn submit_payout(
        &self,
        access_token: &str,
        item: &PayoutItem,
    ) -> std::result::Result<serde_json::Value, ProviderError> {
        let url = format!("{}{}", self.base_url, PAYOUTS_PATH);
        let response = self
            .client
            .post(&url)
            .bearer_auth(access_token)
            .header("PayPal-Request-Id", &item.idempotency_key)
            .json(&payout_body(item))
            .send()
            .await
            .map_err(|e| transport_failure("payout request failed", e))?;

        if !response.status().is_success() {
            return Err(provider_failure("payout rejected", response).await);
        }

        response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| transport_failure("malformed payout response", e))
    }
}
