use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, Type};
use std::fmt;
use uuid::Uuid;

/// Payout lifecycle status as reported by the processor.
/// Only Paid payouts are eligible for reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "payout_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PayoutStatus {
    Pending,
    InTransit,
    Paid,
    Failed,
    Canceled,
}

impl PayoutStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PayoutStatus::Pending => "pending",
            PayoutStatus::InTransit => "in_transit",
            PayoutStatus::Paid => "paid",
            PayoutStatus::Failed => "failed",
            PayoutStatus::Canceled => "canceled",
        }
    }
}

impl fmt::Display for PayoutStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Tenant entity. A church without a connected account cannot be reconciled.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Church {
    pub id: Uuid,
    pub name: String,
    pub stripe_account_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Stored payout row, created upstream when the processor announces a payout.
///
/// Aggregate columns stay at their 0 defaults until reconciliation writes
/// them; `reconciled_at` is the idempotency guard and flips NULL -> non-NULL
/// exactly once. All money columns are integer minor units.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PayoutSummary {
    pub id: Uuid,
    pub stripe_payout_id: String,
    pub church_id: Uuid,
    pub status: PayoutStatus,
    /// The processor's own reported payout amount
    pub amount: i64,
    pub currency: String,
    pub payout_date: DateTime<Utc>,
    pub transaction_count: i32,
    pub gross_volume: i64,
    pub total_fees: i64,
    pub total_refunds: i64,
    pub total_disputes: i64,
    pub net_amount: i64,
    pub reconciled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A paid, unreconciled payout paired with its tenant's connected account
#[derive(Debug, Clone, Serialize)]
pub struct PendingPayout {
    pub stripe_payout_id: String,
    pub church_id: Uuid,
    pub stripe_account_id: String,
    /// Reported amount, compared against the computed net after reconciling
    pub amount: i64,
}
