//! Gym HTTP handlers.
//!
//! - GET /api/v1/gyms/:id - Gym with its current balance
//! - GET /api/v1/gyms/:id/notifications - Recent notifications for the gym

use crate::{
    db::DbPool,
    error::AppError,
    models::gym::{Gym, GymNotification, GymResponse},
    services::notification_service,
};
use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct NotificationsQuery {
    #[serde(default = "default_notifications_limit")]
    pub limit: i64,
}

fn default_notifications_limit() -> i64 {
    20
}

/// Get a gym by ID.
///
/// # Response
///
/// - **Success (200 OK)**: the gym, bank account masked
/// - **Error (404)**: no such gym
pub async fn get_gym(
    State(pool): State<DbPool>,
    Path(gym_id): Path<i64>,
) -> Result<Json<GymResponse>, AppError> {
    let gym = sqlx::query_as::<_, Gym>(
        r#"
        SELECT id, name, owner_email, balance_cents, bank_account_name,
               bank_account_number, bank_ifsc, upi_id, created_at, updated_at
        FROM gyms
        WHERE id = $1
        "#,
    )
    .bind(gym_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::GymNotFound)?;

    Ok(Json(gym.into()))
}

/// List a gym's notifications, newest first.
pub async fn list_notifications(
    State(pool): State<DbPool>,
    Path(gym_id): Path<i64>,
    Query(query): Query<NotificationsQuery>,
) -> Result<Json<Vec<GymNotification>>, AppError> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM gyms WHERE id = $1)")
        .bind(gym_id)
        .fetch_one(&pool)
        .await?;

    if !exists {
        return Err(AppError::GymNotFound);
    }

    let notifications = notification_service::list_for_gym(&pool, gym_id, query.limit).await?;
    Ok(Json(notifications))
}
