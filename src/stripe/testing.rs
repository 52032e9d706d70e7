// Test doubles for the balance ledger seam.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;

use super::client::BalanceLedger;
use super::models::{BalanceTransaction, TransactionType};
use crate::error::{AppResult, ReconcileError};

/// Canned ledger: fixed entries per payout, optional simulated failures.
#[derive(Default)]
pub struct StaticLedger {
    entries: HashMap<String, Vec<BalanceTransaction>>,
    failures: HashSet<String>,
}

impl StaticLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_payout(mut self, payout_id: &str, entries: Vec<BalanceTransaction>) -> Self {
        self.entries.insert(payout_id.to_string(), entries);
        self
    }

    pub fn with_failure(mut self, payout_id: &str) -> Self {
        self.failures.insert(payout_id.to_string());
        self
    }
}

#[async_trait]
impl BalanceLedger for StaticLedger {
    async fn payout_transactions(
        &self,
        _account_id: &str,
        payout_id: &str,
    ) -> AppResult<Vec<BalanceTransaction>> {
        if self.failures.contains(payout_id) {
            return Err(ReconcileError::Fetch {
                payout_id: payout_id.to_string(),
                message: "simulated upstream failure".to_string(),
            }
            .into());
        }
        Ok(self.entries.get(payout_id).cloned().unwrap_or_default())
    }
}

pub fn txn(id: &str, txn_type: TransactionType, amount: i64, fee: i64) -> BalanceTransaction {
    BalanceTransaction {
        id: id.to_string(),
        txn_type,
        amount,
        fee,
        reporting_category: String::new(),
        currency: "usd".to_string(),
    }
}

pub fn dispute_txn(id: &str, amount: i64) -> BalanceTransaction {
    BalanceTransaction {
        id: id.to_string(),
        txn_type: TransactionType::Adjustment,
        amount,
        fee: 0,
        reporting_category: "dispute".to_string(),
        currency: "usd".to_string(),
    }
}
