use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::pool::PoolConnection;
use sqlx::{PgPool, Postgres};
use tokio::sync::Mutex;
use tracing::warn;
use uuid::Uuid;

use super::models::{Church, PayoutStatus, PayoutSummary};
use crate::error::AppResult;
use crate::reconcile::aggregator::ReconciliationTotals;

/// Advisory lock id shared by every replica; one reconcile run at a time
const RUN_LOCK_KEY: i64 = 0x7265636F6E;

/// Persistence seam for payout summaries.
///
/// Rows are created by the payout ingestion pipeline; this service only ever
/// reads them and writes aggregates onto them.
#[async_trait]
pub trait SummaryStore: Send + Sync {
    /// Tenants owning at least one paid, unreconciled payout dated on or
    /// after `since`.
    async fn churches_with_pending(&self, since: DateTime<Utc>) -> AppResult<Vec<Uuid>>;

    /// The tenant's connected account id, if one is configured.
    async fn connected_account(&self, church_id: Uuid) -> AppResult<Option<String>>;

    /// Paid, unreconciled payout rows for one tenant, oldest first.
    async fn pending_payouts(
        &self,
        church_id: Uuid,
        since: DateTime<Utc>,
    ) -> AppResult<Vec<PayoutSummary>>;

    async fn summary_by_payout_id(&self, payout_id: &str) -> AppResult<Option<PayoutSummary>>;

    /// Write aggregates and stamp `reconciled_at`, guarded by
    /// `reconciled_at IS NULL`. Returns the number of rows updated (0 or 1).
    async fn mark_reconciled(
        &self,
        payout_id: &str,
        totals: &ReconciliationTotals,
    ) -> AppResult<u64>;

    /// Try to take the cross-replica run lock. false = a run holds it.
    async fn try_acquire_run_lock(&self) -> AppResult<bool>;

    async fn release_run_lock(&self) -> AppResult<()>;

    async fn ping(&self) -> AppResult<()>;
}

/// Postgres-backed summary store
pub struct PgSummaryStore {
    pub pool: PgPool,
    /// Connection pinned while the advisory lock is held (session-scoped)
    run_lock: Mutex<Option<PoolConnection<Postgres>>>,
}

impl PgSummaryStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            run_lock: Mutex::new(None),
        }
    }
}

#[async_trait]
impl SummaryStore for PgSummaryStore {
    // ========== DISCOVERY OPERATIONS ==========

    async fn churches_with_pending(&self, since: DateTime<Utc>) -> AppResult<Vec<Uuid>> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            r#"
            SELECT DISTINCT church_id
            FROM payout_summaries
            WHERE status = $1 AND reconciled_at IS NULL AND payout_date >= $2
            ORDER BY church_id
            "#,
        )
        .bind(PayoutStatus::Paid)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    async fn connected_account(&self, church_id: Uuid) -> AppResult<Option<String>> {
        let church = sqlx::query_as::<_, Church>(
            r#"
            SELECT id, name, stripe_account_id, created_at, updated_at
            FROM churches
            WHERE id = $1
            "#,
        )
        .bind(church_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(church.and_then(|c| c.stripe_account_id))
    }

    async fn pending_payouts(
        &self,
        church_id: Uuid,
        since: DateTime<Utc>,
    ) -> AppResult<Vec<PayoutSummary>> {
        let rows = sqlx::query_as::<_, PayoutSummary>(
            r#"
            SELECT id, stripe_payout_id, church_id, status, amount, currency, payout_date,
                   transaction_count, gross_volume, total_fees, total_refunds, total_disputes,
                   net_amount, reconciled_at, created_at, updated_at
            FROM payout_summaries
            WHERE church_id = $1 AND status = $2 AND reconciled_at IS NULL AND payout_date >= $3
            ORDER BY payout_date ASC
            "#,
        )
        .bind(church_id)
        .bind(PayoutStatus::Paid)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn summary_by_payout_id(&self, payout_id: &str) -> AppResult<Option<PayoutSummary>> {
        let row = sqlx::query_as::<_, PayoutSummary>(
            r#"
            SELECT id, stripe_payout_id, church_id, status, amount, currency, payout_date,
                   transaction_count, gross_volume, total_fees, total_refunds, total_disputes,
                   net_amount, reconciled_at, created_at, updated_at
            FROM payout_summaries
            WHERE stripe_payout_id = $1
            "#,
        )
        .bind(payout_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    // ========== RECONCILIATION WRITE ==========

    async fn mark_reconciled(
        &self,
        payout_id: &str,
        totals: &ReconciliationTotals,
    ) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE payout_summaries
            SET transaction_count = $2,
                gross_volume = $3,
                total_fees = $4,
                total_refunds = $5,
                total_disputes = $6,
                net_amount = $7,
                reconciled_at = NOW(),
                updated_at = NOW()
            WHERE stripe_payout_id = $1 AND reconciled_at IS NULL
            "#,
        )
        .bind(payout_id)
        .bind(totals.transaction_count)
        .bind(totals.gross_volume)
        .bind(totals.total_fees)
        .bind(totals.total_refunds)
        .bind(totals.total_disputes)
        .bind(totals.net_amount)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    // ========== RUN LOCK ==========

    async fn try_acquire_run_lock(&self) -> AppResult<bool> {
        let mut held = self.run_lock.lock().await;
        if held.is_some() {
            return Ok(false);
        }

        let mut conn = self.pool.acquire().await?;
        let locked: bool = sqlx::query_scalar("SELECT pg_try_advisory_lock($1)")
            .bind(RUN_LOCK_KEY)
            .fetch_one(&mut *conn)
            .await?;

        if locked {
            *held = Some(conn);
        }
        Ok(locked)
    }

    async fn release_run_lock(&self) -> AppResult<()> {
        let mut held = self.run_lock.lock().await;
        if let Some(mut conn) = held.take() {
            let unlocked = sqlx::query("SELECT pg_advisory_unlock($1)")
                .bind(RUN_LOCK_KEY)
                .execute(&mut *conn)
                .await;
            if let Err(e) = unlocked {
                // The lock is session-scoped. Returning this connection to the
                // pool would carry it into the next run, so terminate the
                // session and let Postgres drop the lock with it.
                if let Err(close_err) = conn.close().await {
                    warn!("⚠️ Failed to close run lock connection: {:?}", close_err);
                }
                return Err(e.into());
            }
        }
        Ok(())
    }

    async fn ping(&self) -> AppResult<()> {
        let _: i32 = sqlx::query_scalar("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }
}
