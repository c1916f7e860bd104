//! Payout run endpoint.

use std::sync::Arc;

use crate::{
    config::Config, db::DbPool, error::AppError, middleware::auth::AuthContext,
    models::payout::PayoutSummary, services::payout_service,
};
use axum::{Extension, Json, extract::State};

/// Run the automatic payout batch now.
///
/// # Endpoint
///
/// `POST /api/v1/payouts/run`
///
/// # Response
///
/// - **Success (200 OK)**: the run summary
///   (`{"run_id": "...", "processed": 2, "failed": 1, "skipped": 0}`)
/// - **Error (422)**: payout settings are unusable; nothing was touched
/// - **Error (500)**: the batch was rolled back
pub async fn run_payouts(
    State(pool): State<DbPool>,
    State(config): State<Arc<Config>>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<PayoutSummary>, AppError> {
    tracing::info!(admin = %auth.admin_name, "Payout run requested");

    let summary = payout_service::run_auto_payouts(&pool, &config).await?;
    Ok(Json(summary))
}
