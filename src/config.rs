//! Configuration for the payout saga service.
//!
//! Every field has a default so a partial TOML file (or none at all) is valid.
//! The binary layers CLI flags and environment variables on top.

use crate::error::{Result, TransferError};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,

    #[serde(default)]
    pub verifier: VerifierConfig,

    #[serde(default)]
    pub ledger: LedgerConfig,

    #[serde(default)]
    pub provider: ProviderConfig,

    #[serde(default)]
    pub outcome: OutcomeConfig,

    /// CSV file of `sender,client_id,client_secret` rows.
    #[serde(default)]
    pub principals_path: Option<PathBuf>,

    /// Path to the persistent transfer database.
    #[serde(default)]
    pub db_path: Option<PathBuf>,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_format: LogFormat,
}

/// How the external verifier process is launched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifierConfig {
    #[serde(default = "default_verifier_command")]
    pub command: String,

    #[serde(default)]
    pub args: Vec<String>,

    #[serde(default = "default_verifier_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Base URL of the ledger broadcast gateway. Attestation is unavailable
    /// when unset.
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default = "default_confirmation_timeout")]
    pub confirmation_timeout_secs: u64,

    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_provider_url")]
    pub base_url: String,

    #[serde(default = "default_currency")]
    pub currency: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Shared credentials used for any sender without its own entry.
    #[serde(default)]
    pub default_client_id: Option<String>,

    #[serde(default)]
    pub default_client_secret: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutcomeConfig {
    /// When true a settled transfer whose attestation failed is recorded as
    /// `completed`; when false it is recorded as `partial`.
    #[serde(default = "default_collapse_partial")]
    pub collapse_partial: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            verifier: VerifierConfig::default(),
            ledger: LedgerConfig::default(),
            provider: ProviderConfig::default(),
            outcome: OutcomeConfig::default(),
            principals_path: None,
            db_path: None,
            log_level: default_log_level(),
            log_format: LogFormat::default(),
        }
    }
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            command: default_verifier_command(),
            args: Vec::new(),
            timeout_secs: default_verifier_timeout(),
        }
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            url: None,
            confirmation_timeout_secs: default_confirmation_timeout(),
            poll_interval_ms: default_poll_interval(),
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_provider_url(),
            currency: default_currency(),
            request_timeout_secs: default_request_timeout(),
            default_client_id: None,
            default_client_secret: None,
        }
    }
}

impl Default for OutcomeConfig {
    fn default() -> Self {
        Self {
            collapse_partial: default_collapse_partial(),
        }
    }
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 5000))
}

fn default_verifier_command() -> String {
    "python".to_string()
}

fn default_verifier_timeout() -> u64 {
    30
}

fn default_confirmation_timeout() -> u64 {
    120
}

fn default_poll_interval() -> u64 {
    2_000
}

fn default_provider_url() -> String {
    "https://api-m.sandbox.paypal.com".to_string()
}

fn default_currency() -> String {
    "USD".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_collapse_partial() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

impl ServiceConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| TransferError::ConfigError(format!("{}: {e}", path.display())))
    }
}

impl VerifierConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl LedgerConfig {
    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl ProviderConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
