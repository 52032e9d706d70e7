use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_address: String,
    pub stripe_secret_key: String,
    pub stripe_api_base: String,
    pub reconcile_trigger_token: String,
    /// Token-bucket refill rate (permits per second); one permit covers one
    /// payout's ledger fetch, pages included
    pub ledger_calls_per_sec: u32,
    /// Only payouts dated within this many days are scanned
    pub recon_window_days: i64,
}

impl Config {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Ok(Self {
            database_url: std::env::var("DATABASE_URL")
                .map_err(|_| config::ConfigError::NotFound("DATABASE_URL".to_string()))?,
            bind_address: std::env::var("BIND_ADDRESS")
                .unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            stripe_secret_key: std::env::var("STRIPE_SECRET_KEY")
                .map_err(|_| config::ConfigError::NotFound("STRIPE_SECRET_KEY".to_string()))?,
            stripe_api_base: std::env::var("STRIPE_API_BASE")
                .unwrap_or_else(|_| "https://api.stripe.com".to_string()),
            reconcile_trigger_token: std::env::var("RECONCILE_TRIGGER_TOKEN").map_err(|_| {
                config::ConfigError::NotFound("RECONCILE_TRIGGER_TOKEN".to_string())
            })?,
            ledger_calls_per_sec: std::env::var("LEDGER_CALLS_PER_SEC")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1),
            recon_window_days: std::env::var("RECON_WINDOW_DAYS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(90),
        })
    }
}
