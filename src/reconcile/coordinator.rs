// Single-payout reconciliation
//
// Flow:
// 1. Fetch the full balance transaction list for the payout
// 2. Refuse an empty ledger (paid payouts always have entries)
// 3. Fold entries into integer totals
// 4. One conditional update writes totals + reconciled_at

use std::sync::Arc;

use tracing::{info, warn};

use super::aggregator::{aggregate, ReconciliationTotals};
use crate::error::{AppError, AppResult, ReconcileError};
use crate::store::SummaryStore;
use crate::stripe::BalanceLedger;

pub struct PayoutReconciler {
    ledger: Arc<dyn BalanceLedger>,
    store: Arc<dyn SummaryStore>,
}

impl PayoutReconciler {
    pub fn new(ledger: Arc<dyn BalanceLedger>, store: Arc<dyn SummaryStore>) -> Self {
        Self { ledger, store }
    }

    /// Fetch, aggregate and persist totals for one payout.
    ///
    /// The write is guarded by `reconciled_at IS NULL`: reconciling a payout
    /// that a concurrent run already finished is a no-op, never a double
    /// write.
    pub async fn reconcile(
        &self,
        payout_id: &str,
        account_id: &str,
    ) -> AppResult<ReconciliationTotals> {
        // 1. Materialize the full ledger for this payout
        let entries = self
            .ledger
            .payout_transactions(account_id, payout_id)
            .await?;

        // 2. A paid payout with no ledger entries is a data problem, not a
        //    zero-sum success; leave the row untouched
        if entries.is_empty() {
            return Err(ReconcileError::EmptyLedger {
                payout_id: payout_id.to_string(),
            }
            .into());
        }

        // 3. Fold into integer totals
        let totals = aggregate(payout_id, &entries);

        // 4. Single conditional write
        let updated = self
            .store
            .mark_reconciled(payout_id, &totals)
            .await
            .map_err(|e| persist_error(payout_id, e))?;

        if updated == 0 {
            match self.store.summary_by_payout_id(payout_id).await {
                Ok(Some(existing)) if existing.reconciled_at.is_some() => {
                    warn!(
                        "Payout {} was reconciled by a concurrent run, skipping write",
                        payout_id
                    );
                }
                Ok(_) => {
                    return Err(ReconcileError::SummaryMissing {
                        payout_id: payout_id.to_string(),
                    }
                    .into());
                }
                Err(e) => return Err(persist_error(payout_id, e)),
            }
        }

        info!(
            "✓ Payout {} reconciled: {} transactions, gross {}, fees {}, refunds {}, disputes {}, net {}",
            payout_id,
            totals.transaction_count,
            totals.gross_volume,
            totals.total_fees,
            totals.total_refunds,
            totals.total_disputes,
            totals.net_amount
        );

        Ok(totals)
    }
}

fn persist_error(payout_id: &str, err: AppError) -> AppError {
    ReconcileError::Persist {
        payout_id: payout_id.to_string(),
        message: err.to_string(),
    }
    .into()
}
