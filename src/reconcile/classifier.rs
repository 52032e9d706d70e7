use crate::stripe::models::{BalanceTransaction, TransactionType};

/// What one balance transaction contributes to the payout totals.
///
/// Closed set: every ledger entry maps to exactly one variant, and anything
/// the match does not recognize lands on `Unclassified` instead of being
/// dropped or guessed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Contribution {
    /// Donation money in: gross amount plus the processor's fee
    Sale { gross: i64, fee: i64 },
    /// Money returned to a donor; the fee is the processor's fee credit
    /// (negative), which reduces total fees
    Refund { amount: i64, fee: i64 },
    /// Chargeback withdrawal
    Dispute { amount: i64 },
    /// Counted in the transaction count, contributes to no total
    Unclassified,
}

pub fn classify(txn: &BalanceTransaction) -> Contribution {
    match txn.txn_type {
        TransactionType::Charge | TransactionType::Payment => Contribution::Sale {
            gross: txn.amount,
            fee: txn.fee,
        },
        TransactionType::Refund => Contribution::Refund {
            amount: txn.amount.abs(),
            fee: txn.fee,
        },
        TransactionType::Adjustment if txn.reporting_category == "dispute" => {
            Contribution::Dispute {
                amount: txn.amount.abs(),
            }
        }
        TransactionType::Adjustment | TransactionType::Unknown => Contribution::Unclassified,
    }
}
