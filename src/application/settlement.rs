use crate::domain::ports::PayoutProviderBox;
use crate::domain::steps::{AccessToken, PayoutItem, ProviderCredentials, SettlementResult};
use crate::domain::transfer::Amount;
use crate::error::ProviderError;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Tokens are treated as expired this long before the provider says so.
const EXPIRY_MARGIN: Duration = Duration::from_secs(30);

/// Hex SHA-256 of a credential set. The only form in which credentials are
/// used as a map key or logged.
pub fn credential_fingerprint(credentials: &ProviderCredentials) -> String {
    let mut hasher = Sha256::new();
    hasher.update(credentials.client_id.as_bytes());
    hasher.update([0u8]);
    hasher.update(credentials.client_secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// Derives a fresh provider idempotency key for `(sender, timestamp)`.
///
/// A random nonce is mixed in so that an identical resubmission is a new,
/// independent attempt with its own key.
pub fn idempotency_key(sender: &str, timestamp: DateTime<Utc>) -> String {
    let mut nonce = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut nonce);

    let mut hasher = Sha256::new();
    hasher.update(sender.as_bytes());
    hasher.update([0u8]);
    hasher.update(
        timestamp
            .timestamp_nanos_opt()
            .unwrap_or_else(|| timestamp.timestamp_micros())
            .to_be_bytes(),
    );
    hasher.update(nonce);
    let digest = hex::encode(hasher.finalize());
    digest[..32].to_string()
}

struct CachedToken {
    token: String,
    valid_until: Instant,
}

/// Executes real-money payouts through the provider.
pub struct SettlementClient {
    provider: PayoutProviderBox,
    currency: String,
    tokens: Mutex<HashMap<String, CachedToken>>,
}

impl SettlementClient {
    pub fn new(provider: PayoutProviderBox, currency: impl Into<String>) -> Self {
        Self {
            provider,
            currency: currency.into(),
            tokens: Mutex::new(HashMap::new()),
        }
    }

    /// Submits a single payout item. Never retries.
    pub async fn settle(
        &self,
        sender: &str,
        recipient: &str,
        amount: Amount,
        timestamp: DateTime<Utc>,
        credentials: &ProviderCredentials,
    ) -> SettlementResult {
        let fingerprint = credential_fingerprint(credentials);
        let token = match self.access_token(&fingerprint, credentials).await {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, status = ?e.status, "provider credential exchange failed");
                return SettlementResult::Failed {
                    idempotency_key: None,
                    error: format!("credential exchange failed: {e}"),
                    provider_payload: e.payload,
                };
            }
        };

        let item = PayoutItem {
            recipient: recipient.to_string(),
            amount,
            currency: self.currency.clone(),
            idempotency_key: idempotency_key(sender, timestamp),
        };

        match self.provider.submit_payout(&token, &item).await {
            Ok(provider_response) => {
                info!(idempotency_key = %item.idempotency_key, "payout accepted by provider");
                SettlementResult::Succeeded {
                    idempotency_key: item.idempotency_key,
                    provider_response,
                }
            }
            Err(e) => {
                if e.is_unauthorized() {
                    self.tokens.lock().remove(&fingerprint);
                }
                warn!(
                    idempotency_key = %item.idempotency_key,
                    status = ?e.status,
                    error = %e,
                    "payout rejected"
                );
                SettlementResult::Failed {
                    idempotency_key: Some(item.idempotency_key),
                    error: e.message,
                    provider_payload: e.payload,
                }
            }
        }
    }

    async fn access_token(
        &self,
        fingerprint: &str,
        credentials: &ProviderCredentials,
    ) -> Result<String, ProviderError> {
        let cached = {
            let tokens = self.tokens.lock();
            tokens
                .get(fingerprint)
                .filter(|t| t.valid_until > Instant::now())
                .map(|t| t.token.clone())
        };
        if let Some(token) = cached {
            debug!("reusing cached provider token");
            return Ok(token);
        }

        let issued: AccessToken = self.provider.issue_token(credentials).await?;
        let lifetime = issued.expires_in.saturating_sub(EXPIRY_MARGIN);
        if !lifetime.is_zero() {
            self.tokens.lock().insert(
                fingerprint.to_string(),
                CachedToken {
                    token: issued.token.clone(),
                    valid_until: issued.issued_at + lifetime,
                },
            );
        }
        Ok(issued.token)
    }

    /// Number of credential sets with a live cached token.
    pub fn cached_tokens(&self) -> usize {
        let now = Instant::now();
        self.tokens
            .lock()
            .values()
            .filter(|t| t.valid_until > now)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::PayoutProvider;
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone, Default)]
    struct CountingProvider {
        tokens_issued: Arc<AtomicUsize>,
        keys: Arc<std::sync::Mutex<Vec<String>>>,
        reject_with: Option<ProviderError>,
        expires_in: u64,
    }

    #[async_trait]
    impl PayoutProvider for CountingProvider {
        async fn issue_token(
            &self,
            credentials: &ProviderCredentials,
        ) -> Result<AccessToken, ProviderError> {
            let n = self.tokens_issued.fetch_add(1, Ordering::SeqCst);
            Ok(AccessToken {
                token: format!("{}-{n}", credentials.client_id),
                expires_in: Duration::from_secs(self.expires_in),
                issued_at: Instant::now(),
            })
        }

        async fn submit_payout(
            &self,
            access_token: &str,
            item: &PayoutItem,
        ) -> Result<serde_json::Value, ProviderError> {
            self.keys.lock().unwrap().push(item.idempotency_key.clone());
            match &self.reject_with {
                Some(e) => Err(e.clone()),
                None => Ok(serde_json::json!({ "token": access_token, "batch": "B1" })),
            }
        }
    }

    fn amount() -> Amount {
        Amount::new(dec!(10)).unwrap()
    }

    #[tokio::test]
    async fn test_token_cached_per_credential_set() {
        let provider = CountingProvider {
            expires_in: 3600,
            ..Default::default()
        };
        let issued = provider.tokens_issued.clone();
        let client = SettlementClient::new(Box::new(provider), "USD");
        let alice = ProviderCredentials::new("alice", "s1");
        let bob = ProviderCredentials::new("bob", "s2");

        for _ in 0..3 {
            let result = client
                .settle("a@x.com", "b@x.com", amount(), Utc::now(), &alice)
                .await;
            assert!(result.succeeded());
        }
        assert_eq!(issued.load(Ordering::SeqCst), 1);

        client
            .settle("c@x.com", "b@x.com", amount(), Utc::now(), &bob)
            .await;
        assert_eq!(issued.load(Ordering::SeqCst), 2);
        assert_eq!(client.cached_tokens(), 2);
    }

    #[tokio::test]
    async fn test_short_lived_token_not_cached() {
        let provider = CountingProvider {
            expires_in: 10,
            ..Default::default()
        };
        let issued = provider.tokens_issued.clone();
        let client = SettlementClient::new(Box::new(provider), "USD");
        let creds = ProviderCredentials::new("alice", "s1");

        client.settle("a", "b", amount(), Utc::now(), &creds).await;
        client.settle("a", "b", amount(), Utc::now(), &creds).await;
        assert_eq!(issued.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_fresh_idempotency_key_per_settlement() {
        let provider = CountingProvider {
            expires_in: 3600,
            ..Default::default()
        };
        let keys = provider.keys.clone();
        let client = SettlementClient::new(Box::new(provider), "USD");
        let creds = ProviderCredentials::new("alice", "s1");
        let ts = Utc::now();

        client.settle("a", "b", amount(), ts, &creds).await;
        client.settle("a", "b", amount(), ts, &creds).await;

        let keys = keys.lock().unwrap();
        assert_eq!(keys.len(), 2);
        assert_ne!(keys[0], keys[1]);
        assert_eq!(keys[0].len(), 32);
    }

    #[tokio::test]
    async fn test_rejection_echoes_payload_and_evicts_on_401() {
        let provider = CountingProvider {
            expires_in: 3600,
            reject_with: Some(
                ProviderError::new("token expired")
                    .with_status(401)
                    .with_payload(serde_json::json!({"error": "invalid_token"})),
            ),
            ..Default::default()
        };
        let client = SettlementClient::new(Box::new(provider), "USD");
        let creds = ProviderCredentials::new("alice", "s1");

        let result = client.settle("a", "b", amount(), Utc::now(), &creds).await;
        match result {
            SettlementResult::Failed {
                idempotency_key,
                provider_payload,
                ..
            } => {
                assert!(idempotency_key.is_some());
                assert_eq!(
                    provider_payload,
                    Some(serde_json::json!({"error": "invalid_token"}))
                );
            }
            other => panic!("expected failure, got {other:?}"),
        }
        assert_eq!(client.cached_tokens(), 0);
    }

    #[test]
    fn test_fingerprint_hides_secret() {
        let creds = ProviderCredentials::new("alice", "hunter2");
        let fp = credential_fingerprint(&creds);
        assert_eq!(fp.len(), 64);
        assert!(!fp.contains("hunter2"));
        assert_ne!(
            fp,
            credential_fingerprint(&ProviderCredentials::new("alice", "other"))
        );
    }
}
