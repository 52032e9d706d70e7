use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use super::models::*;
use crate::{
    error::{AppError, AppResult},
    reconcile::{ReconciliationRunner, RunReport},
    store::SummaryStore,
};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn SummaryStore>,
    pub runner: Arc<ReconciliationRunner>,
    pub trigger_token: String,
    pub last_run: Arc<RwLock<Option<RunReport>>>,
}

/// Run the reconciliation batch and return its report
/// POST /api/v1/reconcile/run
pub async fn trigger_run(State(state): State<AppState>) -> AppResult<Json<RunReport>> {
    info!("🚀 Reconciliation run triggered");

    let report = state.runner.run().await?;

    let mut last_run = state.last_run.write().await;
    *last_run = Some(report.clone());

    Ok(Json(report))
}

/// Report from the most recent completed run on this instance
/// GET /api/v1/reconcile/last-run
pub async fn get_last_run(State(state): State<AppState>) -> AppResult<Json<RunReport>> {
    let last_run = state.last_run.read().await;

    match last_run.as_ref() {
        Some(report) => Ok(Json(report.clone())),
        None => Err(AppError::NotFound(
            "No reconciliation run has completed yet".to_string(),
        )),
    }
}

/// Reconciliation state for one payout
/// GET /api/v1/reconcile/payouts/:payout_id
pub async fn get_payout_summary(
    State(state): State<AppState>,
    Path(payout_id): Path<String>,
) -> AppResult<Json<PayoutSummaryResponse>> {
    let summary = state
        .store
        .summary_by_payout_id(&payout_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Payout {} not found", payout_id)))?;

    Ok(Json(summary.into()))
}

/// GET /health - Health check
pub async fn health_check(State(state): State<AppState>) -> AppResult<Json<HealthResponse>> {
    let database = match state.store.ping().await {
        Ok(()) => "connected".to_string(),
        Err(e) => {
            warn!("Health check database probe failed: {:?}", e);
            format!("error: {}", e)
        }
    };

    let status = if database == "connected" {
        "healthy"
    } else {
        "degraded"
    };

    Ok(Json(HealthResponse {
        status: status.to_string(),
        timestamp: Utc::now(),
        database,
    }))
}
