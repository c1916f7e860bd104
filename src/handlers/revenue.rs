//! Revenue distribution endpoint.

use crate::{
    db::DbPool,
    error::AppError,
    middleware::auth::AuthContext,
    services::revenue_service::{self, RevenueSummary},
};
use axum::{Extension, Json, extract::State};

/// Distribute pending visit revenue now.
///
/// # Endpoint
///
/// `POST /api/v1/revenue/distribute`
pub async fn distribute_revenue(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<RevenueSummary>, AppError> {
    tracing::info!(admin = %auth.admin_name, "Revenue distribution requested");

    let summary = revenue_service::distribute_revenue(&pool).await?;
    Ok(Json(summary))
}
