//! Revenue distribution and cut-off chart management.
//!
//! A distribution run credits each gym its share of pending visit revenue.
//! Like the payout batch it is one transaction: either every row the run
//! locked is distributed (or skipped), or nothing changes.

use serde::Serialize;
use serde_json::json;
use sqlx::{PgConnection, PgExecutor};
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        activity_log::SYSTEM_REVENUE_ACTOR,
        revenue::{CreateCutoffRuleRequest, CutoffChart, CutoffRule, PendingRevenue, RevenueSplit},
        settings::format_amount,
    },
    services::{activity_log, notification_service},
};

pub const TITLE_REVENUE_CREDITED: &str = "Revenue Credited";

/// Counters for one distribution run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RevenueSummary {
    pub run_id: Uuid,
    pub distributed: u32,
    /// Rows with no matching cut-off rule; they stay pending
    pub skipped: u32,
}

impl RevenueSummary {
    pub fn total(&self) -> u32 {
        self.distributed + self.skipped
    }
}

impl std::fmt::Display for RevenueSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Distributed: {}, Skipped: {}, Total: {}",
            self.distributed,
            self.skipped,
            self.total()
        )
    }
}

/// Distribute all pending visit revenue.
///
/// # Process
///
/// 1. Start database transaction
/// 2. Load the cut-off chart
/// 3. Lock pending revenue rows (SKIP LOCKED)
/// 4. For each row: split, credit the gym, mark distributed, audit, notify
/// 5. Record the run summary and commit
///
/// On any error, including a failed begin or commit, the run is rolled back
/// and one `revenue_batch_failed` entry is written outside the transaction.
pub async fn distribute_revenue(pool: &DbPool) -> Result<RevenueSummary, AppError> {
    let run_id = Uuid::new_v4();

    match distribute_in_transaction(pool, run_id).await {
        Ok(summary) => {
            tracing::info!(
                %run_id,
                distributed = summary.distributed,
                skipped = summary.skipped,
                "Revenue distribution committed"
            );
            Ok(summary)
        }
        Err(e) => {
            tracing::error!(%run_id, "Revenue distribution rolled back: {}", e);
            activity_log::record_detached(
                pool,
                SYSTEM_REVENUE_ACTOR,
                "revenue_batch_failed",
                json!({ "run_id": run_id, "error": e.to_string() }),
            )
            .await;
            Err(e)
        }
    }
}

async fn distribute_in_transaction(pool: &DbPool, run_id: Uuid) -> Result<RevenueSummary, AppError> {
    let mut tx = pool.begin().await?;

    match distribute(&mut tx, run_id).await {
        Ok(summary) => {
            tx.commit().await?;
            Ok(summary)
        }
        Err(e) => {
            if let Err(rollback_error) = tx.rollback().await {
                tracing::error!("Rollback of revenue distribution failed: {}", rollback_error);
            }
            Err(e)
        }
    }
}

async fn distribute(conn: &mut PgConnection, run_id: Uuid) -> Result<RevenueSummary, AppError> {
    let chart = CutoffChart::new(list_rules(&mut *conn).await?);
    if chart.is_empty() {
        tracing::warn!(%run_id, "Cut-off chart is empty, every row will be skipped");
    }

    let pending = sqlx::query_as::<_, PendingRevenue>(
        r#"
        SELECT id, gym_id, booking_ref, amount_cents, created_at
        FROM visit_revenue
        WHERE status = 'pending'
        ORDER BY created_at, id
        FOR UPDATE SKIP LOCKED
        "#,
    )
    .fetch_all(&mut *conn)
    .await?;

    let mut summary = RevenueSummary {
        run_id,
        distributed: 0,
        skipped: 0,
    };

    for revenue in &pending {
        match chart.split(revenue.amount_cents) {
            Some(split) => {
                credit(&mut *conn, revenue, &split, run_id).await?;
                summary.distributed += 1;
            }
            None => {
                tracing::warn!(
                    revenue_id = revenue.id,
                    amount_cents = revenue.amount_cents,
                    "No cut-off rule covers this amount, leaving it pending"
                );
                summary.skipped += 1;
            }
        }
    }

    activity_log::record(
        &mut *conn,
        SYSTEM_REVENUE_ACTOR,
        "revenue_batch_completed",
        json!({
            "run_id": run_id,
            "distributed": summary.distributed,
            "skipped": summary.skipped,
            "total": summary.total(),
        }),
    )
    .await?;

    Ok(summary)
}

async fn credit(
    conn: &mut PgConnection,
    revenue: &PendingRevenue,
    split: &RevenueSplit,
    run_id: Uuid,
) -> Result<(), AppError> {
    let credited = sqlx::query(
        "UPDATE gyms SET balance_cents = balance_cents + $1, updated_at = NOW() WHERE id = $2",
    )
    .bind(split.gym_cut_cents)
    .bind(revenue.gym_id)
    .execute(&mut *conn)
    .await?
    .rows_affected();

    if credited == 0 {
        return Err(AppError::GymNotFound);
    }

    sqlx::query(
        r#"
        UPDATE visit_revenue
        SET status = 'distributed',
            admin_cut_cents = $1,
            gym_cut_cents = $2,
            distributed_at = NOW()
        WHERE id = $3
        "#,
    )
    .bind(split.admin_cut_cents)
    .bind(split.gym_cut_cents)
    .bind(revenue.id)
    .execute(&mut *conn)
    .await?;

    activity_log::record(
        &mut *conn,
        SYSTEM_REVENUE_ACTOR,
        "revenue_distributed",
        json!({
            "revenue_id": revenue.id,
            "gym_id": revenue.gym_id,
            "booking_ref": revenue.booking_ref,
            "amount_cents": revenue.amount_cents,
            "rule_id": split.rule_id,
            "admin_cut_cents": split.admin_cut_cents,
            "gym_cut_cents": split.gym_cut_cents,
            "run_id": run_id,
        }),
    )
    .await?;

    notification_service::notify_gym(
        &mut *conn,
        revenue.gym_id,
        TITLE_REVENUE_CREDITED,
        &format!(
            "{} has been credited to your balance for booking {}.",
            format_amount(split.gym_cut_cents),
            revenue.booking_ref
        ),
    )
    .await?;

    Ok(())
}

/// List the cut-off chart ordered by range.
pub async fn list_rules<'e, E>(executor: E) -> Result<Vec<CutoffRule>, AppError>
where
    E: PgExecutor<'e>,
{
    let rules = sqlx::query_as::<_, CutoffRule>(
        r#"
        SELECT id, label, min_amount_cents, max_amount_cents, admin_share_bps
        FROM cutoff_rules
        ORDER BY min_amount_cents, id
        "#,
    )
    .fetch_all(executor)
    .await?;

    Ok(rules)
}

pub async fn create_rule(
    pool: &DbPool,
    request: CreateCutoffRuleRequest,
    actor: &str,
) -> Result<CutoffRule, AppError> {
    request.validate().map_err(AppError::InvalidRequest)?;

    let mut tx = pool.begin().await?;

    let rule = sqlx::query_as::<_, CutoffRule>(
        r#"
        INSERT INTO cutoff_rules (label, min_amount_cents, max_amount_cents, admin_share_bps)
        VALUES ($1, $2, $3, $4)
        RETURNING id, label, min_amount_cents, max_amount_cents, admin_share_bps
        "#,
    )
    .bind(request.label.trim())
    .bind(request.min_amount_cents)
    .bind(request.max_amount_cents)
    .bind(request.admin_share_bps)
    .fetch_one(&mut *tx)
    .await?;

    activity_log::record(
        &mut *tx,
        actor,
        "cutoff_rule_created",
        json!({
            "rule_id": rule.id,
            "label": rule.label,
            "min_amount_cents": rule.min_amount_cents,
            "max_amount_cents": rule.max_amount_cents,
            "admin_share_bps": rule.admin_share_bps,
        }),
    )
    .await?;

    tx.commit().await?;

    Ok(rule)
}

pub async fn delete_rule(pool: &DbPool, rule_id: i64, actor: &str) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;

    let deleted = sqlx::query_as::<_, CutoffRule>(
        r#"
        DELETE FROM cutoff_rules WHERE id = $1
        RETURNING id, label, min_amount_cents, max_amount_cents, admin_share_bps
        "#,
    )
    .bind(rule_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(AppError::CutoffRuleNotFound)?;

    activity_log::record(
        &mut *tx,
        actor,
        "cutoff_rule_deleted",
        json!({ "rule_id": deleted.id, "label": deleted.label }),
    )
    .await?;

    tx.commit().await?;

    Ok(())
}
