use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::store::PayoutSummary;

// ========== RESPONSE MODELS ==========

/// Reconciliation state for a single payout
#[derive(Debug, Serialize)]
pub struct PayoutSummaryResponse {
    pub stripe_payout_id: String,
    pub church_id: Uuid,
    pub status: String,
    pub amount: i64,
    pub currency: String,
    pub payout_date: DateTime<Utc>,
    pub reconciled: bool,
    pub reconciled_at: Option<DateTime<Utc>>,
    pub transaction_count: i32,
    pub gross_volume: i64,
    pub total_fees: i64,
    pub total_refunds: i64,
    pub total_disputes: i64,
    pub net_amount: i64,
}

impl From<PayoutSummary> for PayoutSummaryResponse {
    fn from(summary: PayoutSummary) -> Self {
        Self {
            stripe_payout_id: summary.stripe_payout_id,
            church_id: summary.church_id,
            status: summary.status.as_str().to_string(),
            amount: summary.amount,
            currency: summary.currency,
            payout_date: summary.payout_date,
            reconciled: summary.reconciled_at.is_some(),
            reconciled_at: summary.reconciled_at,
            transaction_count: summary.transaction_count,
            gross_volume: summary.gross_volume,
            total_fees: summary.total_fees,
            total_refunds: summary.total_refunds,
            total_disputes: summary.total_disputes,
            net_amount: summary.net_amount,
        }
    }
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub database: String,
}
