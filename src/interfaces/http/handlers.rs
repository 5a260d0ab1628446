use super::AppState;
use crate::application::coordinator::SagaReport;
use crate::application::disconnect::Disconnect;
use crate::domain::steps::SettlementResult;
use crate::domain::transfer::TransferRequest;
use crate::error::TransferError;
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::error;

pub async fn handle_health() -> impl IntoResponse {
    Json(json!({ "status": "healthy" }))
}

/// `POST /transfer`.
///
/// The saga runs on its own task so that a caller who disconnects mid-flight
/// does not abort a settlement; dropping the guard only cuts short the
/// attestation wait.
pub async fn handle_transfer(
    State(state): State<Arc<AppState>>,
    body: Result<Json<TransferRequest>, JsonRejection>,
) -> Response {
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => {
            return error_body(
                StatusCode::BAD_REQUEST,
                "Malformed transfer request",
                "validate",
                Value::String(rejection.body_text()),
            );
        }
    };

    let (guard, disconnect) = Disconnect::pair();
    let saga = state.saga.clone();
    let joined = tokio::spawn(async move { saga.execute(request, disconnect).await }).await;
    drop(guard);

    match joined {
        Ok(Ok(report)) => report_response(&report),
        Ok(Err(e)) => rejection_response(&e),
        Err(e) => {
            error!(error = %e, "saga task aborted");
            error_body(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal error",
                "internal",
                Value::Null,
            )
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TransferQuery {
    pub party: Option<String>,
    pub limit: Option<usize>,
}

/// `GET /transfers`: newest first, optionally narrowed to one party.
pub async fn handle_list_transfers(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TransferQuery>,
) -> Response {
    match state.saga.history().await {
        Ok(records) => {
            let records: Vec<_> = records
                .into_iter()
                .filter(|r| query.party.as_deref().is_none_or(|p| r.involves(p)))
                .take(query.limit.unwrap_or(usize::MAX))
                .collect();
            Json(records).into_response()
        }
        Err(e) => {
            error!(error = %e, "failed to list transfers");
            error_body(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Transfer history unavailable",
                "persist",
                Value::String(e.to_string()),
            )
        }
    }
}

fn error_body(status: StatusCode, message: &str, step: &str, details: Value) -> Response {
    (
        status,
        Json(json!({
            "error": message,
            "step": step,
            "details": details,
        })),
    )
        .into_response()
}

/// Failures that ended the saga before any record existed.
pub fn rejection_response(err: &TransferError) -> Response {
    let (status, message) = match err {
        TransferError::ValidationError(_) => (StatusCode::BAD_REQUEST, "Invalid transfer request"),
        TransferError::PrincipalNotFound(_) => (StatusCode::BAD_REQUEST, "Unknown sender"),
        TransferError::VerificationRejected(_) => {
            (StatusCode::BAD_REQUEST, "Transaction verification failed")
        }
        TransferError::GatewayError(_) | TransferError::GatewayTimeout(_) => {
            (StatusCode::BAD_GATEWAY, "Verifier unavailable")
        }
        TransferError::IdentityError(_) => (StatusCode::BAD_GATEWAY, "Principal store unavailable"),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "Internal error"),
    };
    let details = match err {
        TransferError::VerificationRejected(reason) => reason.clone(),
        other => other.to_string(),
    };
    error_body(status, message, err.step(), Value::String(details))
}

/// `"skipped"` when attestation was not requested, the confirmed reference
/// when it was, `null` otherwise.
pub fn ledger_reference(report: &SagaReport) -> Value {
    if !report.attest_requested {
        return Value::String("skipped".to_string());
    }
    report
        .attestation
        .tx_reference
        .clone()
        .map(Value::String)
        .unwrap_or(Value::Null)
}

/// Maps a finished saga to its HTTP response. Every variant carries the
/// references collected so far for reconciliation.
pub fn report_response(report: &SagaReport) -> Response {
    let mut body = json!({
        "outcome": report.outcome,
        "recordId": report.record.as_ref().map(|r| r.id.clone()),
        "referenceHash": report.reference_hash,
        "ledgerTxReference": ledger_reference(report),
        "attestationError": report.attestation.error,
        "idempotencyKey": report.settlement.idempotency_key(),
    });

    let status = match &report.settlement {
        SettlementResult::Succeeded {
            provider_response, ..
        } => {
            body["settlementResponse"] = provider_response.clone();
            StatusCode::OK
        }
        SettlementResult::Failed {
            error,
            provider_payload,
            ..
        } => {
            let failure = TransferError::SettlementError(error.clone());
            body["error"] = json!(failure.to_string());
            body["step"] = json!(failure.step());
            body["details"] = provider_payload
                .clone()
                .unwrap_or_else(|| Value::String(error.clone()));
            StatusCode::BAD_GATEWAY
        }
    };

    if let Some(persist_error) = &report.persist_error {
        body["error"] = json!("Transfer record could not be persisted");
        body["step"] = json!("persist");
        body["degraded"] = json!(true);
        body["settlementSucceeded"] = json!(report.settlement.succeeded());
        body["persistError"] = json!(persist_error);
        return (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response();
    }

    (status, Json(body)).into_response()
}
