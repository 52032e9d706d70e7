use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sqlx::migrate::MigrateError;
use serde::Serialize;
use thiserror::Error;

/// Top-level error type for the entire application
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Reconciliation error: {0}")]
    Reconcile(#[from] ReconcileError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("External error: {0}")]
    ExternalError(String),
}

/// Reconciliation-related errors
#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("Ledger fetch failed for payout {payout_id}: {message}")]
    Fetch { payout_id: String, message: String },

    #[error("No balance transactions found for payout {payout_id}")]
    EmptyLedger { payout_id: String },

    #[error("Payout summary not found: {payout_id}")]
    SummaryMissing { payout_id: String },

    #[error("Failed to persist totals for payout {payout_id}: {message}")]
    Persist { payout_id: String, message: String },

    #[error("Payout discovery failed: {0}")]
    Discovery(String),

    #[error("A reconciliation run is already in progress")]
    RunInProgress,
}

/// API error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code, message, details) = match self {
            AppError::Reconcile(ReconcileError::RunInProgress) => (
                StatusCode::CONFLICT,
                "RUN_IN_PROGRESS",
                "A reconciliation run is already in progress".to_string(),
                None,
            ),
            AppError::Reconcile(ReconcileError::Fetch { payout_id, message }) => (
                StatusCode::BAD_GATEWAY,
                "LEDGER_FETCH_FAILED",
                format!("Ledger fetch failed for payout {}: {}", payout_id, message),
                Some(serde_json::json!({"payout_id": payout_id})),
            ),
            AppError::Reconcile(ReconcileError::EmptyLedger { payout_id }) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "EMPTY_LEDGER",
                format!("No balance transactions found for payout {}", payout_id),
                Some(serde_json::json!({"payout_id": payout_id})),
            ),
            AppError::Reconcile(ReconcileError::SummaryMissing { payout_id }) => (
                StatusCode::NOT_FOUND,
                "SUMMARY_NOT_FOUND",
                format!("Payout summary not found: {}", payout_id),
                Some(serde_json::json!({"payout_id": payout_id})),
            ),
            AppError::Reconcile(ReconcileError::Persist { payout_id, message }) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "PERSIST_FAILED",
                format!("Failed to persist totals for payout {}: {}", payout_id, message),
                Some(serde_json::json!({"payout_id": payout_id})),
            ),
            AppError::Reconcile(ReconcileError::Discovery(message)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "DISCOVERY_FAILED",
                format!("Payout discovery failed: {}", message),
                None,
            ),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "Missing or invalid authorization token".to_string(),
                None,
            ),
            AppError::NotFound(what) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("Not found: {}", what),
                None,
            ),
            AppError::Database(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "DATABASE_ERROR",
                "A database error occurred".to_string(),
                None,
            ),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
                None,
            ),
        };

        let body = Json(ErrorResponse {
            error: message,
            error_code: error_code.to_string(),
            details,
        });

        (status, body).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        AppError::Internal(format!("Error converting: {:?}", error))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(error: reqwest::Error) -> Self {
        AppError::ExternalError(format!("HTTP request error: {:?}", error))
    }
}

impl From<MigrateError> for AppError {
    fn from(error: MigrateError) -> Self {
        AppError::Internal(format!("Migration error: {:?}", error))
    }
}

impl From<config::ConfigError> for AppError {
    fn from(error: config::ConfigError) -> Self {
        AppError::Config(error.to_string())
    }
}

/// Result type alias for the application
pub type AppResult<T> = Result<T, AppError>;
