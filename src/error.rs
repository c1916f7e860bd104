//! Error types and HTTP error response handling.
//!
//! This module defines all application errors and how they are converted
//! into HTTP responses with appropriate status codes and JSON bodies.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::models::settings::SettingsError;
use crate::models::withdrawal::StatusError;

/// Application-wide error type.
///
/// # Error Categories
///
/// - **Database Errors**: Any sqlx::Error from database operations
/// - **Authentication Errors**: Invalid or missing admin API keys
/// - **Resource Errors**: Requested resources not found
/// - **State Errors**: Withdrawal is no longer pending
/// - **Settings Errors**: Payout settings missing or malformed
/// - **Validation Errors**: Invalid request data
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Database operation failed (e.g., connection error, lock timeout).
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// API key is missing, invalid, or inactive.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("Invalid API key")]
    InvalidApiKey,

    /// Returns HTTP 404 Not Found.
    #[error("Withdrawal not found")]
    WithdrawalNotFound,

    /// Returns HTTP 404 Not Found.
    #[error("Gym not found")]
    GymNotFound,

    /// Returns HTTP 404 Not Found.
    #[error("Cut-off rule not found")]
    CutoffRuleNotFound,

    /// The withdrawal already reached a terminal status.
    ///
    /// Returns HTTP 409 Conflict.
    #[error(transparent)]
    InvalidTransition(#[from] StatusError),

    /// Payout settings could not be loaded or failed validation.
    ///
    /// Returns HTTP 422 Unprocessable Entity.
    #[error("Invalid payout settings: {0}")]
    Settings(#[from] SettingsError),

    /// Request body or parameters are invalid.
    ///
    /// Returns HTTP 400 Bad Request.
    #[error("Invalid request")]
    InvalidRequest(String),
}

/// Convert AppError into an HTTP response.
///
/// # Response Format
///
/// ```json
/// {
///   "error": {
///     "code": "error_type",
///     "message": "Human-readable error message"
///   }
/// }
/// ```
///
/// Database errors map to 500 and never leak details to the client.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::InvalidApiKey => (
                StatusCode::UNAUTHORIZED,
                "invalid_api_key",
                self.to_string(),
            ),
            AppError::WithdrawalNotFound => (
                StatusCode::NOT_FOUND,
                "withdrawal_not_found",
                self.to_string(),
            ),
            AppError::GymNotFound => (StatusCode::NOT_FOUND, "gym_not_found", self.to_string()),
            AppError::CutoffRuleNotFound => (
                StatusCode::NOT_FOUND,
                "cutoff_rule_not_found",
                self.to_string(),
            ),
            AppError::InvalidTransition(_) => (
                StatusCode::CONFLICT,
                "withdrawal_already_processed",
                self.to_string(),
            ),
            AppError::Settings(_) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "invalid_settings",
                self.to_string(),
            ),
            AppError::InvalidRequest(ref msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request", msg.clone())
            }
            AppError::Database(ref e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
