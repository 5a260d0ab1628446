use super::AppState;
use super::handlers::{handle_health, handle_list_transfers, handle_transfer};
use super::middleware::logging_middleware;
use crate::error::Result;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

pub async fn run_http_server(addr: SocketAddr, state: Arc<AppState>) -> Result<()> {
    let app = build_router(state);
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "payout saga listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| {
            error!(%addr, error = %err, "HTTP server terminated unexpectedly");
            err.into()
        })
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/transfer", post(handle_transfer))
        // Historical route name kept for existing clients.
        .route("/send-money", post(handle_transfer))
        .route("/transfers", get(handle_list_transfers))
        .route("/health", get(handle_health))
        .layer(DefaultBodyLimit::max(64 * 1024))
        .layer(axum::middleware::from_fn(logging_middleware))
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
