use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::error::AppResult;
use crate::store::{PendingPayout, SummaryStore};

/// Finds the payouts a batch run should work on.
///
/// Purely reads; the only predicate that matters is
/// `status = paid AND reconciled_at IS NULL` within the recency window.
pub struct PayoutScanner {
    store: Arc<dyn SummaryStore>,
}

impl PayoutScanner {
    pub fn new(store: Arc<dyn SummaryStore>) -> Self {
        Self { store }
    }

    /// Tenants with at least one reconcilable payout
    pub async fn churches_with_pending(&self, since: DateTime<Utc>) -> AppResult<Vec<Uuid>> {
        self.store.churches_with_pending(since).await
    }

    /// Reconcilable payouts for one tenant, each paired with the tenant's
    /// connected account id. A tenant without a connected account has
    /// nothing scannable; that is an empty result, not an error.
    pub async fn scan(
        &self,
        church_id: Uuid,
        since: DateTime<Utc>,
    ) -> AppResult<Vec<PendingPayout>> {
        let account_id = match self.store.connected_account(church_id).await? {
            Some(account_id) => account_id,
            None => {
                debug!("Church {} has no connected account, nothing to scan", church_id);
                return Ok(Vec::new());
            }
        };

        let rows = self.store.pending_payouts(church_id, since).await?;

        Ok(rows
            .into_iter()
            .map(|row| PendingPayout {
                stripe_payout_id: row.stripe_payout_id,
                church_id: row.church_id,
                stripe_account_id: account_id.clone(),
                amount: row.amount,
            })
            .collect())
    }
}
