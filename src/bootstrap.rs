use std::{sync::Arc, time::Duration};

use sqlx::{postgres::PgPoolOptions, PgPool};
use tokio::sync::RwLock;
use tracing::info;

use crate::{
    api::handler::AppState,
    config::Config,
    error::AppResult,
    reconcile::{ReconciliationRunner, RunnerConfig},
    store::PgSummaryStore,
    stripe::StripeClient,
};

pub async fn initialize_app_state(config: &Config) -> AppResult<AppState> {
    info!("Initializing application components ...");

    // Database pool
    let pool = initialize_database(&config.database_url).await?;

    let store = Arc::new(PgSummaryStore::new(pool));
    info!("✅ Payout summary store initialized");

    let stripe = Arc::new(StripeClient::with_base_url(
        config.stripe_secret_key.clone(),
        config.stripe_api_base.clone(),
    ));
    info!("✅ Stripe balance ledger client initialized");

    let runner = Arc::new(ReconciliationRunner::new(
        store.clone(),
        stripe,
        RunnerConfig {
            window_days: config.recon_window_days,
            ledger_calls_per_sec: config.ledger_calls_per_sec,
        },
    ));
    info!(
        "✅ Reconciliation runner initialized ({} ledger call/s, {} day window)",
        config.ledger_calls_per_sec, config.recon_window_days
    );

    Ok(AppState {
        store,
        runner,
        trigger_token: config.reconcile_trigger_token.clone(),
        last_run: Arc::new(RwLock::new(None)),
    })
}

fn pool_options() -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(30))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
}

async fn initialize_database(database_url: &str) -> AppResult<PgPool> {
    info!("📊 Connecting to database...");

    let pool = pool_options().connect(database_url).await?;

    // Run migrations
    info!("🔄 Running database migrations...");
    sqlx::migrate!("./migrations").run(&pool).await?;

    info!("✓ Database initialized");
    Ok(pool)
}
