use serde::Serialize;
use tracing::warn;

use super::classifier::{classify, Contribution};
use crate::stripe::models::BalanceTransaction;

/// Integer minor-unit totals for one payout.
///
/// net_amount = gross_volume - total_fees - total_refunds - total_disputes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
pub struct ReconciliationTotals {
    pub transaction_count: i32,
    pub gross_volume: i64,
    pub total_fees: i64,
    pub total_refunds: i64,
    pub total_disputes: i64,
    pub net_amount: i64,
}

/// Fold every ledger entry into totals.
///
/// Pure integer arithmetic, so entry order never changes the result. Every
/// entry counts toward transaction_count, including unclassified ones, which
/// are logged so unexpected ledger shapes stay visible.
pub fn aggregate(payout_id: &str, entries: &[BalanceTransaction]) -> ReconciliationTotals {
    let mut totals = ReconciliationTotals::default();

    for txn in entries {
        totals.transaction_count += 1;

        match classify(txn) {
            Contribution::Sale { gross, fee } => {
                totals.gross_volume += gross;
                totals.total_fees += fee;
            }
            Contribution::Refund { amount, fee } => {
                totals.total_refunds += amount;
                totals.total_fees += fee;
            }
            Contribution::Dispute { amount } => {
                totals.total_disputes += amount;
            }
            Contribution::Unclassified => {
                warn!(
                    "⚠️ Unclassified transaction {} (type: {}, category: {:?}) on payout {}: counted, excluded from totals",
                    txn.id, txn.txn_type, txn.reporting_category, payout_id
                );
            }
        }
    }

    totals.net_amount =
        totals.gross_volume - totals.total_fees - totals.total_refunds - totals.total_disputes;

    totals
}
