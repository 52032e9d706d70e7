// Stripe balance transaction client
//
// Payout Reconciliation Flow:
// 1. Query /v1/balance_transactions scoped to one payout
// 2. Page with starting_after cursors until has_more = false
// 3. Materialize the full list before any aggregation
//
// All calls are scoped to the tenant's connected account via the
// Stripe-Account header.

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::models::{BalanceTransaction, BalanceTransactionList};
use crate::error::{AppError, AppResult, ReconcileError};

const PAGE_LIMIT: u32 = 100;

/// Read access to the processor's balance ledger
#[async_trait]
pub trait BalanceLedger: Send + Sync {
    /// Fetch every balance transaction that composed the given payout,
    /// scoped to the tenant's connected account, in ledger order.
    async fn payout_transactions(
        &self,
        account_id: &str,
        payout_id: &str,
    ) -> AppResult<Vec<BalanceTransaction>>;
}

pub struct StripeClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl StripeClient {
    /// `base_url` is the live API in production and a mock server in tests
    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url,
        }
    }

    async fn fetch_page(
        &self,
        account_id: &str,
        payout_id: &str,
        starting_after: Option<&str>,
    ) -> AppResult<BalanceTransactionList> {
        let mut params = vec![
            ("payout".to_string(), payout_id.to_string()),
            ("limit".to_string(), PAGE_LIMIT.to_string()),
        ];
        if let Some(after) = starting_after {
            params.push(("starting_after".to_string(), after.to_string()));
        }

        let response = self
            .client
            .get(format!("{}/v1/balance_transactions", self.base_url))
            .basic_auth(&self.api_key, Some(""))
            .header("Stripe-Account", account_id)
            .query(&params)
            .send()
            .await
            .map_err(|e| fetch_error(payout_id, format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(fetch_error(
                payout_id,
                format!(
                    "HTTP {}: {}",
                    status.as_u16(),
                    extract_error_message(&body, status.as_u16())
                ),
            ));
        }

        response
            .json::<BalanceTransactionList>()
            .await
            .map_err(|e| fetch_error(payout_id, format!("invalid response body: {}", e)))
    }
}

#[async_trait]
impl BalanceLedger for StripeClient {
    async fn payout_transactions(
        &self,
        account_id: &str,
        payout_id: &str,
    ) -> AppResult<Vec<BalanceTransaction>> {
        let mut all = Vec::new();
        let mut starting_after: Option<String> = None;
        let mut page_num = 0u32;

        loop {
            page_num += 1;
            let page = self
                .fetch_page(account_id, payout_id, starting_after.as_deref())
                .await?;

            debug!(
                "Payout {} page {}: {} transactions",
                payout_id,
                page_num,
                page.data.len()
            );

            let has_more = page.has_more;
            let next_cursor = page.data.last().map(|txn| txn.id.clone());
            all.extend(page.data);

            if !has_more {
                break;
            }

            // has_more with an empty page can never terminate
            let cursor = match next_cursor {
                Some(id) => id,
                None => {
                    return Err(fetch_error(
                        payout_id,
                        "has_more=true with empty data (malformed response)".to_string(),
                    ));
                }
            };

            // A repeated cursor means the upstream is not advancing
            if starting_after.as_deref() == Some(cursor.as_str()) {
                return Err(fetch_error(
                    payout_id,
                    format!("pagination stuck: starting_after={} repeated", cursor),
                ));
            }

            starting_after = Some(cursor);
        }

        debug!(
            "✓ Payout {}: {} balance transactions across {} pages",
            payout_id,
            all.len(),
            page_num
        );

        Ok(all)
    }
}

fn fetch_error(payout_id: &str, message: String) -> AppError {
    ReconcileError::Fetch {
        payout_id: payout_id.to_string(),
        message,
    }
    .into()
}

fn extract_error_message(body: &str, status: u16) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(|s| s.to_string()))
        .unwrap_or_else(|| format!("HTTP {}", status))
}
