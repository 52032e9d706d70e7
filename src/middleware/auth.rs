use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use tracing::warn;

use crate::api::AppState;
use crate::error::AppError;

/// Shared-secret bearer check for the reconciliation trigger.
/// Rejects before the handler runs, so an unauthorized call has no side effects.
pub async fn require_bearer(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let authorized = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map_or(false, |token| token == state.trigger_token);

    if !authorized {
        warn!("⚠️ Rejected reconciliation trigger without a valid bearer token");
        return Err(AppError::Unauthorized);
    }

    Ok(next.run(req).await)
}
