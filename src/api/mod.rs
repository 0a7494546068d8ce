//! HTTP surface for the external scheduler.
//!
//! `GET /api/cron/calculate-interest` runs the interest accrual job for the
//! current UTC day. `GET /api/credits/{id}/invoice` returns the printable
//! invoice of a credit. Both authenticate with `Authorization: Bearer <CRON_SECRET>`.

use crate::{
    config::{ledger, scheduler::SchedulerConfig},
    core::{
        accrual::{self, AccrualReport},
        credit::fetch_credit_by_id,
        invoice,
    },
    errors::Error,
};
use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    routing::get,
};
use chrono::{NaiveDate, Utc};
use sea_orm::DatabaseConnection;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Shared state handed to every handler
#[derive(Debug, Clone)]
pub struct ApiState {
    /// Database connection pool
    pub db: Arc<DatabaseConnection>,
    /// Ledger policies and invoice header
    pub ledger: ledger::Config,
    /// Secret and listener settings
    pub scheduler: SchedulerConfig,
}

/// Builds the router with the health check, the accrual trigger and invoices.
pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/cron/calculate-interest", get(calculate_interest))
        .route("/api/credits/{credit_id}/invoice", get(credit_invoice))
        .with_state(state)
}

fn authorization(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
}

async fn healthz() -> &'static str {
    "ok"
}

fn timestamp() -> String {
    Utc::now().to_rfc3339()
}

/// Handler for the accrual trigger.
pub async fn calculate_interest(
    State(state): State<ApiState>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    trigger_accrual(&state, &headers, Utc::now().date_naive()).await
}

async fn trigger_accrual(
    state: &ApiState,
    headers: &HeaderMap,
    today: NaiveDate,
) -> (StatusCode, Json<Value>) {
    if let Err(e) = state.scheduler.authorize(authorization(headers)) {
        warn!("Rejected interest accrual trigger: bad or missing bearer token");
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "success": false,
                "error": e.to_string(),
                "message": "Invalid or missing cron secret",
                "timestamp": timestamp(),
            })),
        );
    }

    match accrual::run_accrual(&state.db, today).await {
        Ok(report) => {
            info!("{}", accrual::format_accrual_summary(&report));
            (StatusCode::OK, Json(success_body(&report)))
        }
        Err(e) => {
            error!("Interest accrual run failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "success": false,
                    "error": "Failed to calculate interest",
                    "message": e.to_string(),
                    "timestamp": timestamp(),
                })),
            )
        }
    }
}

/// Plain-text invoice of a credit, headed with the configured business info.
pub async fn credit_invoice(
    State(state): State<ApiState>,
    Path(credit_id): Path<i64>,
    headers: HeaderMap,
) -> Result<String, (StatusCode, String)> {
    state
        .scheduler
        .authorize(authorization(&headers))
        .map_err(|e| (StatusCode::UNAUTHORIZED, e.to_string()))?;

    let credit = fetch_credit_by_id(state.db.as_ref(), credit_id)
        .await
        .map_err(|e| {
            error!("Failed to load credit {}: {}", credit_id, e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                Error::CreditNotFound { id: credit_id }.to_string(),
            )
        })?;

    Ok(invoice::render_invoice(
        &credit,
        &state.ledger.business,
        Utc::now(),
    ))
}

fn success_body(report: &AccrualReport) -> Value {
    json!({
        "success": true,
        "message": accrual::format_accrual_summary(report),
        "updated": report.updated_count,
        "failures": report.failures,
        "timestamp": timestamp(),
    })
}
