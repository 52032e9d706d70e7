// In-memory summary store for tests. Mirrors the Postgres semantics
// closely enough to exercise the scanner, coordinator and runner without
// a database: same predicate filters, same conditional write, same
// run-lock refusal.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use super::models::{Church, PayoutStatus, PayoutSummary};
use super::repository::SummaryStore;
use crate::error::{AppError, AppResult};
use crate::reconcile::aggregator::ReconciliationTotals;

#[derive(Default)]
pub struct MemorySummaryStore {
    churches: Mutex<Vec<Church>>,
    summaries: Mutex<Vec<PayoutSummary>>,
    lock_held: AtomicBool,
    write_failures: HashSet<String>,
}

impl MemorySummaryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_church(self, church: Church) -> Self {
        self.churches.lock().unwrap().push(church);
        self
    }

    pub fn with_summary(self, summary: PayoutSummary) -> Self {
        self.summaries.lock().unwrap().push(summary);
        self
    }

    /// Pre-hold the run lock, as if another replica owned it
    pub fn holding_run_lock(self) -> Self {
        self.lock_held.store(true, Ordering::SeqCst);
        self
    }

    /// Simulate the summary write failing for one payout
    pub fn with_write_failure(mut self, payout_id: &str) -> Self {
        self.write_failures.insert(payout_id.to_string());
        self
    }

    pub fn run_lock_held(&self) -> bool {
        self.lock_held.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SummaryStore for MemorySummaryStore {
    async fn churches_with_pending(&self, since: DateTime<Utc>) -> AppResult<Vec<Uuid>> {
        let summaries = self.summaries.lock().unwrap();
        let mut ids: Vec<Uuid> = summaries
            .iter()
            .filter(|s| {
                s.status == PayoutStatus::Paid
                    && s.reconciled_at.is_none()
                    && s.payout_date >= since
            })
            .map(|s| s.church_id)
            .collect();
        ids.sort();
        ids.dedup();
        Ok(ids)
    }

    async fn connected_account(&self, church_id: Uuid) -> AppResult<Option<String>> {
        let churches = self.churches.lock().unwrap();
        Ok(churches
            .iter()
            .find(|c| c.id == church_id)
            .and_then(|c| c.stripe_account_id.clone()))
    }

    async fn pending_payouts(
        &self,
        church_id: Uuid,
        since: DateTime<Utc>,
    ) -> AppResult<Vec<PayoutSummary>> {
        let summaries = self.summaries.lock().unwrap();
        let mut rows: Vec<PayoutSummary> = summaries
            .iter()
            .filter(|s| {
                s.church_id == church_id
                    && s.status == PayoutStatus::Paid
                    && s.reconciled_at.is_none()
                    && s.payout_date >= since
            })
            .cloned()
            .collect();
        rows.sort_by_key(|s| s.payout_date);
        Ok(rows)
    }

    async fn summary_by_payout_id(&self, payout_id: &str) -> AppResult<Option<PayoutSummary>> {
        let summaries = self.summaries.lock().unwrap();
        Ok(summaries
            .iter()
            .find(|s| s.stripe_payout_id == payout_id)
            .cloned())
    }

    async fn mark_reconciled(
        &self,
        payout_id: &str,
        totals: &ReconciliationTotals,
    ) -> AppResult<u64> {
        if self.write_failures.contains(payout_id) {
            return Err(AppError::Internal("simulated write failure".to_string()));
        }

        let mut summaries = self.summaries.lock().unwrap();
        for summary in summaries.iter_mut() {
            if summary.stripe_payout_id == payout_id && summary.reconciled_at.is_none() {
                summary.transaction_count = totals.transaction_count;
                summary.gross_volume = totals.gross_volume;
                summary.total_fees = totals.total_fees;
                summary.total_refunds = totals.total_refunds;
                summary.total_disputes = totals.total_disputes;
                summary.net_amount = totals.net_amount;
                summary.reconciled_at = Some(Utc::now());
                summary.updated_at = Utc::now();
                return Ok(1);
            }
        }
        Ok(0)
    }

    async fn try_acquire_run_lock(&self) -> AppResult<bool> {
        Ok(!self.lock_held.swap(true, Ordering::SeqCst))
    }

    async fn release_run_lock(&self) -> AppResult<()> {
        self.lock_held.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}

// ========== ROW BUILDERS ==========

pub fn church(name: &str, stripe_account_id: Option<&str>) -> Church {
    Church {
        id: Uuid::new_v4(),
        name: name.to_string(),
        stripe_account_id: stripe_account_id.map(|s| s.to_string()),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

pub fn paid_payout(payout_id: &str, church_id: Uuid, amount: i64) -> PayoutSummary {
    PayoutSummary {
        id: Uuid::new_v4(),
        stripe_payout_id: payout_id.to_string(),
        church_id,
        status: PayoutStatus::Paid,
        amount,
        currency: "usd".to_string(),
        payout_date: Utc::now() - Duration::days(2),
        transaction_count: 0,
        gross_volume: 0,
        total_fees: 0,
        total_refunds: 0,
        total_disputes: 0,
        net_amount: 0,
        reconciled_at: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

pub fn with_status(mut summary: PayoutSummary, status: PayoutStatus) -> PayoutSummary {
    summary.status = status;
    summary
}

pub fn already_reconciled(mut summary: PayoutSummary) -> PayoutSummary {
    summary.reconciled_at = Some(Utc::now() - Duration::hours(1));
    summary
}
