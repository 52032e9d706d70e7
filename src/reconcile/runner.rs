// Batch reconciliation run
//
// Run Flow:
// 1. Take the cross-replica run lock (advisory; refuse overlap)
// 2. Discover churches with pending paid payouts
// 3. Walk churches serially; walk each church's payouts serially
// 4. Take a token-bucket permit before each payout's ledger fetch
// 5. Record per-payout outcomes; a failed payout never stops the run
// 6. Release the lock and return the run report

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::aggregator::ReconciliationTotals;
use super::coordinator::PayoutReconciler;
use super::pacer::CallPacer;
use super::scanner::PayoutScanner;
use crate::error::{AppResult, ReconcileError};
use crate::store::SummaryStore;
use crate::stripe::BalanceLedger;

#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Only payouts dated within this many days are scanned
    pub window_days: i64,
    /// Token-bucket refill rate; one permit covers one payout's ledger
    /// fetch, pages included
    pub ledger_calls_per_sec: u32,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            window_days: 90,
            ledger_calls_per_sec: 1,
        }
    }
}

/// Outcome for one payout within a run
#[derive(Debug, Clone, Serialize)]
pub struct PayoutOutcome {
    pub payout_id: String,
    pub church_id: Uuid,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub totals: Option<ReconciliationTotals>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// What one batch run did, returned to the trigger caller
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub churches_scanned: usize,
    /// Churches whose pending-payout scan failed and were skipped whole
    pub churches_skipped: Vec<Uuid>,
    pub payouts_reconciled: usize,
    pub payouts_failed: usize,
    pub outcomes: Vec<PayoutOutcome>,
}

/// Serial batch runner over every tenant with pending payouts
pub struct ReconciliationRunner {
    scanner: PayoutScanner,
    reconciler: PayoutReconciler,
    pacer: CallPacer,
    store: Arc<dyn SummaryStore>,
    config: RunnerConfig,
}

impl ReconciliationRunner {
    pub fn new(
        store: Arc<dyn SummaryStore>,
        ledger: Arc<dyn BalanceLedger>,
        config: RunnerConfig,
    ) -> Self {
        Self {
            scanner: PayoutScanner::new(store.clone()),
            reconciler: PayoutReconciler::new(ledger, store.clone()),
            pacer: CallPacer::new(config.ledger_calls_per_sec),
            store,
            config,
        }
    }

    /// Execute one batch run. Refuses to overlap a run already in flight.
    pub async fn run(&self) -> AppResult<RunReport> {
        if !self.store.try_acquire_run_lock().await? {
            return Err(ReconcileError::RunInProgress.into());
        }

        let result = self.run_locked().await;

        if let Err(e) = self.store.release_run_lock().await {
            error!("Failed to release run lock: {:?}", e);
        }

        result
    }

    async fn run_locked(&self) -> AppResult<RunReport> {
        let started_at = Utc::now();
        let since = started_at - Duration::days(self.config.window_days);

        info!("🔄 Starting reconciliation run (window: {} days)", self.config.window_days);

        // Discovery failing means nothing can even be scanned; this is the
        // one error that aborts the whole run
        let churches = self
            .scanner
            .churches_with_pending(since)
            .await
            .map_err(|e| ReconcileError::Discovery(e.to_string()))?;

        if churches.is_empty() {
            info!("✓ No churches with pending payouts");
            return Ok(RunReport {
                started_at,
                finished_at: Utc::now(),
                churches_scanned: 0,
                churches_skipped: Vec::new(),
                payouts_reconciled: 0,
                payouts_failed: 0,
                outcomes: Vec::new(),
            });
        }

        info!("📊 Found {} churches with pending payouts", churches.len());

        let mut outcomes = Vec::new();
        let mut churches_skipped = Vec::new();

        for church_id in &churches {
            let pending = match self.scanner.scan(*church_id, since).await {
                Ok(pending) => pending,
                Err(e) => {
                    // Skip just this tenant; the rest of the run continues
                    error!("❌ Scan failed for church {}: {:?}", church_id, e);
                    churches_skipped.push(*church_id);
                    continue;
                }
            };

            if pending.is_empty() {
                continue;
            }

            info!("🔄 Church {}: {} payouts to reconcile", church_id, pending.len());

            for payout in pending {
                self.pacer.acquire().await;

                match self
                    .reconciler
                    .reconcile(&payout.stripe_payout_id, &payout.stripe_account_id)
                    .await
                {
                    Ok(totals) => {
                        if totals.net_amount != payout.amount {
                            warn!(
                                "⚠️ Payout {} computed net {} differs from reported amount {}",
                                payout.stripe_payout_id, totals.net_amount, payout.amount
                            );
                        }
                        outcomes.push(PayoutOutcome {
                            payout_id: payout.stripe_payout_id,
                            church_id: payout.church_id,
                            success: true,
                            totals: Some(totals),
                            error: None,
                        });
                    }
                    Err(e) => {
                        error!(
                            "❌ Reconciliation failed for payout {}: {:?}",
                            payout.stripe_payout_id, e
                        );
                        outcomes.push(PayoutOutcome {
                            payout_id: payout.stripe_payout_id,
                            church_id: payout.church_id,
                            success: false,
                            totals: None,
                            error: Some(e.to_string()),
                        });
                    }
                }
            }
        }

        let payouts_reconciled = outcomes.iter().filter(|o| o.success).count();
        let payouts_failed = outcomes.len() - payouts_reconciled;
        let finished_at = Utc::now();

        info!(
            "✓ Reconciliation run completed: {} churches, {} payouts reconciled, {} failed in {}ms",
            churches.len(),
            payouts_reconciled,
            payouts_failed,
            (finished_at - started_at).num_milliseconds()
        );

        Ok(RunReport {
            started_at,
            finished_at,
            churches_scanned: churches.len(),
            churches_skipped,
            payouts_reconciled,
            payouts_failed,
            outcomes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::store::memory::{church, paid_payout, MemorySummaryStore};
    use crate::stripe::models::TransactionType;
    use crate::stripe::testing::{txn, StaticLedger};

    fn fast_config() -> RunnerConfig {
        RunnerConfig {
            window_days: 90,
            ledger_calls_per_sec: 1000,
        }
    }

    fn charge_entries(amount: i64, fee: i64) -> Vec<crate::stripe::models::BalanceTransaction> {
        vec![txn("txn_1", TransactionType::Charge, amount, fee)]
    }

    #[tokio::test]
    async fn test_failed_payout_does_not_stop_the_run() {
        let grace = church("Grace Fellowship", Some("acct_grace"));
        let store = Arc::new(
            MemorySummaryStore::new()
                .with_church(grace.clone())
                .with_summary(paid_payout("po_1", grace.id, 9680))
                .with_summary(paid_payout("po_2", grace.id, 500))
                .with_summary(paid_payout("po_3", grace.id, 4845)),
        );
        let ledger = StaticLedger::new()
            .with_payout("po_1", charge_entries(10000, 320))
            .with_failure("po_2")
            .with_payout("po_3", charge_entries(5000, 155));

        let runner = ReconciliationRunner::new(store.clone(), Arc::new(ledger), fast_config());
        let report = runner.run().await.unwrap();

        assert_eq!(report.churches_scanned, 1);
        assert_eq!(report.payouts_reconciled, 2);
        assert_eq!(report.payouts_failed, 1);
        assert_eq!(report.outcomes.len(), 3);

        let failed = report.outcomes.iter().find(|o| !o.success).unwrap();
        assert_eq!(failed.payout_id, "po_2");
        assert!(failed.error.as_deref().unwrap().contains("simulated"));

        // The two healthy payouts are persisted, the failed one is untouched
        let po_1 = store.summary_by_payout_id("po_1").await.unwrap().unwrap();
        let po_2 = store.summary_by_payout_id("po_2").await.unwrap().unwrap();
        let po_3 = store.summary_by_payout_id("po_3").await.unwrap().unwrap();
        assert!(po_1.reconciled_at.is_some());
        assert!(po_2.reconciled_at.is_none());
        assert!(po_3.reconciled_at.is_some());

        // Lock is released even though a payout failed
        assert!(!store.run_lock_held());
    }

    #[tokio::test]
    async fn test_second_run_finds_nothing_to_do() {
        let grace = church("Grace Fellowship", Some("acct_grace"));
        let store = Arc::new(
            MemorySummaryStore::new()
                .with_church(grace.clone())
                .with_summary(paid_payout("po_1", grace.id, 9680)),
        );
        let ledger = Arc::new(StaticLedger::new().with_payout("po_1", charge_entries(10000, 320)));

        let runner = ReconciliationRunner::new(store.clone(), ledger.clone(), fast_config());

        let first = runner.run().await.unwrap();
        assert_eq!(first.payouts_reconciled, 1);
        let reconciled_at = store
            .summary_by_payout_id("po_1")
            .await
            .unwrap()
            .unwrap()
            .reconciled_at;

        let second = runner.run().await.unwrap();
        assert_eq!(second.churches_scanned, 0);
        assert!(second.outcomes.is_empty());

        // Nothing changed on the already reconciled row
        let row = store.summary_by_payout_id("po_1").await.unwrap().unwrap();
        assert_eq!(row.reconciled_at, reconciled_at);
        assert_eq!(row.net_amount, 9680);
    }

    #[tokio::test]
    async fn test_overlapping_run_is_refused() {
        let grace = church("Grace Fellowship", Some("acct_grace"));
        let store = Arc::new(
            MemorySummaryStore::new()
                .with_church(grace.clone())
                .with_summary(paid_payout("po_1", grace.id, 9680))
                .holding_run_lock(),
        );
        let ledger = StaticLedger::new().with_payout("po_1", charge_entries(10000, 320));

        let runner = ReconciliationRunner::new(store.clone(), Arc::new(ledger), fast_config());
        let err = runner.run().await.unwrap_err();

        assert!(matches!(
            err,
            AppError::Reconcile(ReconcileError::RunInProgress)
        ));

        // The refused run must not have touched anything
        let row = store.summary_by_payout_id("po_1").await.unwrap().unwrap();
        assert!(row.reconciled_at.is_none());
    }

    #[tokio::test]
    async fn test_church_without_account_is_skipped() {
        let grace = church("Grace Fellowship", Some("acct_grace"));
        let hope = church("New Hope Chapel", None);
        let store = Arc::new(
            MemorySummaryStore::new()
                .with_church(grace.clone())
                .with_church(hope.clone())
                .with_summary(paid_payout("po_grace", grace.id, 9680))
                .with_summary(paid_payout("po_hope", hope.id, 100)),
        );
        let ledger = StaticLedger::new().with_payout("po_grace", charge_entries(10000, 320));

        let runner = ReconciliationRunner::new(store.clone(), Arc::new(ledger), fast_config());
        let report = runner.run().await.unwrap();

        // Both churches are discovered, but only the connected one yields work
        assert_eq!(report.churches_scanned, 2);
        assert_eq!(report.outcomes.len(), 1);
        assert_eq!(report.outcomes[0].payout_id, "po_grace");

        let row = store.summary_by_payout_id("po_hope").await.unwrap().unwrap();
        assert!(row.reconciled_at.is_none());
    }

    #[tokio::test]
    async fn test_empty_ledger_is_recorded_as_failure() {
        let grace = church("Grace Fellowship", Some("acct_grace"));
        let store = Arc::new(
            MemorySummaryStore::new()
                .with_church(grace.clone())
                .with_summary(paid_payout("po_1", grace.id, 9680)),
        );
        let ledger = StaticLedger::new().with_payout("po_1", vec![]);

        let runner = ReconciliationRunner::new(store.clone(), Arc::new(ledger), fast_config());
        let report = runner.run().await.unwrap();

        assert_eq!(report.payouts_failed, 1);
        assert!(report.outcomes[0]
            .error
            .as_deref()
            .unwrap()
            .contains("No balance transactions"));
    }

    #[tokio::test]
    async fn test_persist_failure_is_isolated_to_its_payout() {
        let grace = church("Grace Fellowship", Some("acct_grace"));
        let store = Arc::new(
            MemorySummaryStore::new()
                .with_church(grace.clone())
                .with_summary(paid_payout("po_1", grace.id, 9680))
                .with_summary(paid_payout("po_2", grace.id, 4845))
                .with_write_failure("po_1"),
        );
        let ledger = StaticLedger::new()
            .with_payout("po_1", charge_entries(10000, 320))
            .with_payout("po_2", charge_entries(5000, 155));

        let runner = ReconciliationRunner::new(store.clone(), Arc::new(ledger), fast_config());
        let report = runner.run().await.unwrap();

        assert_eq!(report.payouts_reconciled, 1);
        assert_eq!(report.payouts_failed, 1);

        let failed = report.outcomes.iter().find(|o| !o.success).unwrap();
        assert_eq!(failed.payout_id, "po_1");
        assert!(failed.error.as_deref().unwrap().contains("persist totals"));

        // The failed write leaves its row eligible for the next run
        let po_1 = store.summary_by_payout_id("po_1").await.unwrap().unwrap();
        let po_2 = store.summary_by_payout_id("po_2").await.unwrap().unwrap();
        assert!(po_1.reconciled_at.is_none());
        assert!(po_2.reconciled_at.is_some());
        assert_eq!(po_2.net_amount, 4845);
        assert!(!store.run_lock_held());
    }

    #[tokio::test]
    async fn test_net_mismatch_still_reconciles() {
        let grace = church("Grace Fellowship", Some("acct_grace"));
        // Reported amount disagrees with what the ledger folds to
        let store = Arc::new(
            MemorySummaryStore::new()
                .with_church(grace.clone())
                .with_summary(paid_payout("po_1", grace.id, 9999)),
        );
        let ledger = StaticLedger::new().with_payout("po_1", charge_entries(10000, 320));

        let runner = ReconciliationRunner::new(store.clone(), Arc::new(ledger), fast_config());
        let report = runner.run().await.unwrap();

        assert_eq!(report.payouts_reconciled, 1);
        let row = store.summary_by_payout_id("po_1").await.unwrap().unwrap();
        assert_eq!(row.net_amount, 9680);
        assert!(row.reconciled_at.is_some());
    }
}
