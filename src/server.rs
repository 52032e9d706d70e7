use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::{
    api::handler::{get_last_run, get_payout_summary, health_check, trigger_run, AppState},
    middleware::require_bearer,
};

pub async fn create_app(state: AppState) -> Router {
    info!("⚙️ Setting up HTTP routes...");

    // Build the application router with all routes and middleware
    let app = Router::new()
        // Public health check endpoint
        .route("/health", get(health_check))
        // API v1 routes
        .nest(
            "/api/v1",
            Router::new()
                // Trigger is guarded by the shared-secret bearer token
                .route(
                    "/reconcile/run",
                    post(trigger_run).route_layer(axum::middleware::from_fn_with_state(
                        state.clone(),
                        require_bearer,
                    )),
                )
                .route("/reconcile/last-run", get(get_last_run))
                .route("/reconcile/payouts/:payout_id", get(get_payout_summary)),
        )
        .layer(CompressionLayer::new())
        .layer(CorsLayer::very_permissive())
        // Add request tracing
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    info!("✓ HTTP routes configured");
    app
}

pub async fn run_server(app: Router, bind_address: &str) -> Result<(), Box<dyn std::error::Error>> {
    let listener = tokio::net::TcpListener::bind(bind_address).await?;
    info!("🌐 Server listening on: {}", bind_address);

    axum::serve(listener, app).await?;
    Ok(())
}
