use serde::{Deserialize, Serialize};
use std::fmt;

/// Balance transaction type tag.
///
/// The processor reports more types than we reconcile; everything outside the
/// closed set lands on `Unknown` so new types surface in logs instead of
/// breaking deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Charge,
    Payment,
    Refund,
    Adjustment,
    #[serde(other)]
    Unknown,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Charge => "charge",
            TransactionType::Payment => "payment",
            TransactionType::Refund => "refund",
            TransactionType::Adjustment => "adjustment",
            TransactionType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One ledger entry from the processor's balance transaction list.
///
/// Amounts and fees are signed integer minor units (cents). Refund rows carry
/// a negative amount and a negative fee (the fee credit).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceTransaction {
    pub id: String,
    #[serde(rename = "type")]
    pub txn_type: TransactionType,
    pub amount: i64,
    pub fee: i64,
    /// "dispute" marks dispute adjustments; tolerate absence
    #[serde(default)]
    pub reporting_category: String,
    #[serde(default)]
    pub currency: String,
}

/// One page of the balance transaction list endpoint
#[derive(Debug, Deserialize)]
pub struct BalanceTransactionList {
    pub data: Vec<BalanceTransaction>,
    pub has_more: bool,
}
