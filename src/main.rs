use clap::{Args, Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use payout_saga::application::attestation::AttestationBroadcaster;
use payout_saga::application::coordinator::SettlementSaga;
use payout_saga::application::observer::TracingObserver;
use payout_saga::application::outcome_ledger::{OutcomeLedger, OutcomePolicy};
use payout_saga::application::settlement::SettlementClient;
use payout_saga::application::verification::VerificationGateway;
use payout_saga::config::{LogFormat, ServiceConfig};
use payout_saga::domain::ports::{PrincipalStoreBox, TransferStoreBox};
use payout_saga::domain::steps::ProviderCredentials;
use payout_saga::infrastructure::http_ledger::HttpLedgerBroadcaster;
use payout_saga::infrastructure::http_payout::HttpPayoutProvider;
use payout_saga::infrastructure::in_memory::{InMemoryPrincipalStore, InMemoryTransferStore};
use payout_saga::infrastructure::process_verifier::ProcessVerifier;
use payout_saga::interfaces::csv::principal_reader::PrincipalReader;
use payout_saga::interfaces::csv::transfer_writer::TransferWriter;
use payout_saga::interfaces::http::AppState;
use payout_saga::interfaces::http::router::run_http_server;
use std::collections::HashMap;
use std::fs::File;
use std::io;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(author, version, about = "Verified payout saga service", long_about = None)]
struct Cli {
    /// TOML configuration file; flags and environment variables override it.
    #[arg(long, global = true, env = "PAYOUT_SAGA_CONFIG")]
    config: Option<PathBuf>,

    /// Path to persistent database (optional). Requires the `storage-rocksdb` feature.
    #[arg(long, global = true, env = "PAYOUT_SAGA_DB_PATH")]
    db_path: Option<PathBuf>,

    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    #[arg(long, global = true, value_enum, env = "PAYOUT_SAGA_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP service.
    Serve(ServeArgs),
    /// Write stored transfer records as CSV to stdout, newest first.
    Export,
}

#[derive(Args)]
struct ServeArgs {
    #[arg(long, env = "PAYOUT_SAGA_LISTEN")]
    listen: Option<SocketAddr>,

    /// CSV of `sender,client_id,client_secret` rows.
    #[arg(long, env = "PAYOUT_SAGA_PRINCIPALS")]
    principals: Option<PathBuf>,

    #[arg(long, env = "PAYOUT_SAGA_VERIFIER_COMMAND")]
    verifier_command: Option<String>,

    #[arg(long, env = "PAYOUT_SAGA_VERIFIER_ARGS", value_delimiter = ' ')]
    verifier_args: Option<Vec<String>>,

    #[arg(long, env = "PAYOUT_SAGA_VERIFIER_TIMEOUT_SECS")]
    verifier_timeout_secs: Option<u64>,

    /// Base URL of the ledger broadcast gateway; attestation is unavailable without it.
    #[arg(long, env = "PAYOUT_SAGA_LEDGER_URL")]
    ledger_url: Option<String>,

    #[arg(long, env = "PAYOUT_SAGA_CONFIRMATION_TIMEOUT_SECS")]
    confirmation_timeout_secs: Option<u64>,

    #[arg(long, env = "PAYOUT_SAGA_POLL_INTERVAL_MS")]
    poll_interval_ms: Option<u64>,

    #[arg(long, env = "PAYOUT_SAGA_PROVIDER_URL")]
    provider_url: Option<String>,

    #[arg(long, env = "PAYOUT_SAGA_CURRENCY")]
    currency: Option<String>,

    #[arg(long, env = "PAYOUT_CLIENT_ID")]
    client_id: Option<String>,

    #[arg(long, env = "PAYOUT_CLIENT_SECRET", hide_env_values = true)]
    client_secret: Option<String>,

    /// Record settled transfers with failed attestation as `partial` instead of `completed`.
    #[arg(long)]
    no_collapse_partial: bool,
}

impl Cli {
    fn load_config(&self) -> Result<ServiceConfig> {
        let mut config = match &self.config {
            Some(path) => ServiceConfig::from_file(path).into_diagnostic()?,
            None => ServiceConfig::default(),
        };
        if let Some(db_path) = &self.db_path {
            config.db_path = Some(db_path.clone());
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        if let Some(format) = self.log_format {
            config.log_format = format;
        }
        if let Command::Serve(args) = &self.command {
            args.apply(&mut config);
        }
        Ok(config)
    }
}

impl ServeArgs {
    fn apply(&self, config: &mut ServiceConfig) {
        if let Some(listen) = self.listen {
            config.listen = listen;
        }
        if let Some(path) = &self.principals {
            config.principals_path = Some(path.clone());
        }
        if let Some(command) = &self.verifier_command {
            config.verifier.command = command.clone();
        }
        if let Some(args) = &self.verifier_args {
            config.verifier.args = args.clone();
        }
        if let Some(secs) = self.verifier_timeout_secs {
            config.verifier.timeout_secs = secs;
        }
        if let Some(url) = &self.ledger_url {
            config.ledger.url = Some(url.clone());
        }
        if let Some(secs) = self.confirmation_timeout_secs {
            config.ledger.confirmation_timeout_secs = secs;
        }
        if let Some(ms) = self.poll_interval_ms {
            config.ledger.poll_interval_ms = ms;
        }
        if let Some(url) = &self.provider_url {
            config.provider.base_url = url.clone();
        }
        if let Some(currency) = &self.currency {
            config.provider.currency = currency.clone();
        }
        if let Some(id) = &self.client_id {
            config.provider.default_client_id = Some(id.clone());
        }
        if let Some(secret) = &self.client_secret {
            config.provider.default_client_secret = Some(secret.clone());
        }
        if self.no_collapse_partial {
            config.outcome.collapse_partial = false;
        }
    }
}

fn init_tracing(config: &ServiceConfig) {
    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    match config.log_format {
        LogFormat::Pretty => registry
            .with(fmt::layer().with_writer(io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(io::stderr))
            .init(),
    }
}

fn open_store(db_path: Option<&Path>) -> Result<TransferStoreBox> {
    let Some(db_path) = db_path else {
        return Ok(Box::new(InMemoryTransferStore::new()));
    };

    #[cfg(feature = "storage-rocksdb")]
    {
        use payout_saga::infrastructure::rocksdb::RocksDBStore;
        info!(path = %db_path.display(), "opening persistent transfer store");
        let store = RocksDBStore::open(db_path).into_diagnostic()?;
        Ok(Box::new(store))
    }

    #[cfg(not(feature = "storage-rocksdb"))]
    {
        warn!(
            path = %db_path.display(),
            "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
        );
        Ok(Box::new(InMemoryTransferStore::new()))
    }
}

fn principal_store(config: &ServiceConfig) -> Result<PrincipalStoreBox> {
    let principals = match &config.principals_path {
        Some(path) => {
            let file = File::open(path).into_diagnostic()?;
            PrincipalReader::new(file).load().into_diagnostic()?
        }
        None => HashMap::new(),
    };
    let mut store = InMemoryPrincipalStore::new(principals);
    match (
        &config.provider.default_client_id,
        &config.provider.default_client_secret,
    ) {
        (Some(id), Some(secret)) => {
            store = store.with_fallback(ProviderCredentials::new(id.clone(), secret.clone()));
        }
        (None, None) => {}
        _ => warn!("default provider credentials need both a client id and a secret; ignoring"),
    }
    if store.is_empty() {
        warn!("no settlement credentials configured; every transfer will be rejected");
    } else {
        info!(senders = store.len(), "loaded settlement credentials");
    }
    Ok(Box::new(store))
}

fn build_saga(config: &ServiceConfig, store: TransferStoreBox) -> Result<SettlementSaga> {
    let verifier = ProcessVerifier::new(&config.verifier.command, config.verifier.args.clone());
    let gateway = VerificationGateway::new(Box::new(verifier), config.verifier.timeout());

    let attestation = match &config.ledger.url {
        Some(url) => {
            let ledger =
                HttpLedgerBroadcaster::new(url, config.provider.request_timeout()).into_diagnostic()?;
            Some(AttestationBroadcaster::new(
                Box::new(ledger),
                config.ledger.confirmation_timeout(),
                config.ledger.poll_interval(),
            ))
        }
        None => {
            info!("no ledger configured; attestation requests will be recorded as unavailable");
            None
        }
    };

    let provider =
        HttpPayoutProvider::new(&config.provider.base_url, config.provider.request_timeout())
            .into_diagnostic()?;
    let settlement = SettlementClient::new(Box::new(provider), &config.provider.currency);

    let ledger = OutcomeLedger::new(
        store,
        OutcomePolicy {
            collapse_partial: config.outcome.collapse_partial,
        },
    );

    Ok(SettlementSaga::new(
        principal_store(config)?,
        gateway,
        attestation,
        settlement,
        ledger,
    )
    .with_observer(Box::new(TracingObserver)))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.load_config()?;
    init_tracing(&config);

    let store = open_store(config.db_path.as_deref())?;

    match cli.command {
        Command::Serve(_) => {
            info!("payout-saga v{}", env!("CARGO_PKG_VERSION"));
            let saga = build_saga(&config, store)?;
            run_http_server(config.listen, Arc::new(AppState::new(saga)))
                .await
                .into_diagnostic()?;
        }
        Command::Export => {
            let records = store.list().await.into_diagnostic()?;
            let stdout = io::stdout();
            let mut writer = TransferWriter::new(stdout.lock());
            writer.write_transfers(records).into_diagnostic()?;
        }
    }

    Ok(())
}
