//! Activity log endpoint.

use crate::{
    db::DbPool,
    error::AppError,
    models::activity_log::{ActivityLogEntry, ActivityLogQuery},
    services::activity_log,
};
use axum::{
    Json,
    extract::{Query, State},
};

/// List recent audit entries.
///
/// # Endpoint
///
/// `GET /api/v1/activity-logs?limit=50&action=payout_failed`
pub async fn list_activity_logs(
    State(pool): State<DbPool>,
    Query(query): Query<ActivityLogQuery>,
) -> Result<Json<Vec<ActivityLogEntry>>, AppError> {
    let entries = activity_log::list_recent(&pool, &query).await?;
    Ok(Json(entries))
}
