//! Gym-facing notifications.

use sqlx::PgExecutor;

use crate::{db::DbPool, error::AppError, models::gym::GymNotification};

pub async fn notify_gym<'e, E>(executor: E, gym_id: i64, title: &str, message: &str) -> Result<(), AppError>
where
    E: PgExecutor<'e>,
{
    sqlx::query("INSERT INTO gym_notifications (gym_id, title, message) VALUES ($1, $2, $3)")
        .bind(gym_id)
        .bind(title)
        .bind(message)
        .execute(executor)
        .await?;

    Ok(())
}

pub async fn list_for_gym(pool: &DbPool, gym_id: i64, limit: i64) -> Result<Vec<GymNotification>, AppError> {
    let notifications = sqlx::query_as::<_, GymNotification>(
        r#"
        SELECT id, gym_id, title, message, is_read, created_at
        FROM gym_notifications
        WHERE gym_id = $1
        ORDER BY created_at DESC, id DESC
        LIMIT $2
        "#,
    )
    .bind(gym_id)
    .bind(limit.clamp(1, 200))
    .fetch_all(pool)
    .await?;

    Ok(notifications)
}
