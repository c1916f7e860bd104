//! Append-only audit trail.
//!
//! Writes take any Postgres executor so they join whatever transaction the
//! caller is in: a payout entry commits or rolls back together with the
//! status change it describes.

use sqlx::PgExecutor;

use crate::{db::DbPool, error::AppError, models::activity_log::{ActivityLogEntry, ActivityLogQuery}};

/// Append one entry.
pub async fn record<'e, E>(
    executor: E,
    actor: &str,
    action: &str,
    details: serde_json::Value,
) -> Result<(), AppError>
where
    E: PgExecutor<'e>,
{
    sqlx::query("INSERT INTO activity_logs (actor, action, details) VALUES ($1, $2, $3)")
        .bind(actor)
        .bind(action)
        .bind(details)
        .execute(executor)
        .await?;

    Ok(())
}

/// Append one entry outside of any transaction, logging instead of failing.
///
/// Used for run-level failures, after the run's own transaction has been
/// rolled back.
pub async fn record_detached(pool: &DbPool, actor: &str, action: &str, details: serde_json::Value) {
    if let Err(e) = record(pool, actor, action, details).await {
        tracing::error!("Failed to write '{}' activity entry: {}", action, e);
    }
}

/// Most recent entries first.
pub async fn list_recent(pool: &DbPool, query: &ActivityLogQuery) -> Result<Vec<ActivityLogEntry>, AppError> {
    let entries = sqlx::query_as::<_, ActivityLogEntry>(
        r#"
        SELECT id, actor, action, details, created_at
        FROM activity_logs
        WHERE ($1::text IS NULL OR action = $1)
        ORDER BY created_at DESC, id DESC
        LIMIT $2
        "#,
    )
    .bind(query.action.as_deref())
    .bind(query.limit.clamp(1, 500))
    .fetch_all(pool)
    .await?;

    Ok(entries)
}
