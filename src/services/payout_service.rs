//! Payout service - moves withdrawal requests to a terminal status.
//!
//! This service handles:
//! - The automatic payout batch (eligibility, gateway calls, settlement)
//! - Manual completion/failure of a single withdrawal by an administrator
//! - Withdrawal queries for the admin API
//!
//! # Atomicity Guarantees
//!
//! A batch runs inside ONE PostgreSQL transaction. Eligible rows are locked
//! with `FOR UPDATE ... SKIP LOCKED`, and every status change is also a
//! compare-and-swap on `status = 'pending'`, so two overlapping runs can never
//! settle the same withdrawal twice. Each item's writes sit in a savepoint so
//! a database error on one item can be undone without losing the others.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::json;
use sqlx::{Acquire, PgConnection};
use uuid::Uuid;

use crate::{
    config::Config,
    db::DbPool,
    error::AppError,
    gateway::{self, GatewayError, PaymentGateway, PayoutInstruction},
    models::{
        activity_log::SYSTEM_PAYOUT_ACTOR,
        payout::{PayoutResolution, PayoutSummary},
        settings::PayoutSettings,
        withdrawal::{
            CompleteWithdrawalRequest, EligibleWithdrawal, FailWithdrawalRequest,
            ListWithdrawalsQuery, StatusError, Withdrawal, WithdrawalStatus,
        },
    },
    services::{activity_log, notification_service, settings_service},
};

/// Failure reason stored on the withdrawal and shown to the gym when the
/// result could not be written. The database error only goes to the log
/// and the activity entry.
pub const RECORDING_FAILED_REASON: &str = "could not record payout result";

/// Run the automatic payout batch.
///
/// # Process
///
/// 1. Load settings (abort before touching any row if they are unusable)
/// 2. Stop early when auto payouts are disabled
/// 3. Build the gateway chosen by the settings
/// 4. Run the batch (see [`PayoutBatch::run`])
///
/// # Errors
///
/// - `Settings` / `Database` while loading settings: one `payout_settings_error`
///   activity entry is written
/// - any batch-level error: the batch is rolled back and one
///   `payout_batch_failed` activity entry is written
pub async fn run_auto_payouts(pool: &DbPool, config: &Config) -> Result<PayoutSummary, AppError> {
    let run_id = Uuid::new_v4();

    let settings = match settings_service::load_payout_settings(pool).await {
        Ok(settings) => settings,
        Err(e) => return Err(abort_before_start(pool, run_id, e).await),
    };

    if !settings.enabled {
        tracing::info!(%run_id, "Auto payouts are disabled, nothing to do");
        return Ok(PayoutSummary::new(run_id));
    }

    let gateway = match gateway::build_gateway(settings.gateway, config) {
        Ok(gateway) => gateway,
        Err(e) => return Err(abort_before_start(pool, run_id, e.into()).await),
    };

    PayoutBatch {
        run_id,
        settings: &settings,
        gateway: gateway.as_ref(),
        gateway_timeout: config.gateway_timeout(),
        now: Utc::now(),
    }
    .run(pool)
    .await
}

async fn abort_before_start(pool: &DbPool, run_id: Uuid, error: AppError) -> AppError {
    tracing::error!(%run_id, "Payout run aborted, settings unusable: {}", error);
    activity_log::record_detached(
        pool,
        SYSTEM_PAYOUT_ACTOR,
        "payout_settings_error",
        json!({ "run_id": run_id, "error": error.to_string() }),
    )
    .await;
    error
}

/// Who is applying a resolution, recorded with its activity entry.
struct AuditContext<'a> {
    actor: &'a str,
    run_id: Option<Uuid>,
    /// Internal error that forced a fallback failure; never shown to gyms
    error: Option<String>,
}

impl<'a> AuditContext<'a> {
    fn manual(actor: &'a str) -> Self {
        Self {
            actor,
            run_id: None,
            error: None,
        }
    }
}

/// One payout run with its inputs fixed up front.
pub struct PayoutBatch<'a> {
    pub run_id: Uuid,
    pub settings: &'a PayoutSettings,
    pub gateway: &'a dyn PaymentGateway,
    /// Upper bound for a single gateway call, whatever the gateway does itself
    pub gateway_timeout: Duration,
    /// Reference time for the minimum-age check
    pub now: DateTime<Utc>,
}

impl PayoutBatch<'_> {
    /// Process every eligible withdrawal in one transaction.
    ///
    /// # Process
    ///
    /// 1. Start database transaction
    /// 2. Lock eligible withdrawals (pending, old enough, small enough)
    /// 3. For each: call the gateway, then settle it as completed or failed
    /// 4. Record the run summary
    /// 5. Commit (or roll back everything on error)
    ///
    /// Any error, including failing to begin or commit the transaction, is
    /// recorded as one `payout_batch_failed` entry written outside it.
    pub async fn run(&self, pool: &DbPool) -> Result<PayoutSummary, AppError> {
        match self.run_in_transaction(pool).await {
            Ok(summary) => {
                tracing::info!(
                    run_id = %self.run_id,
                    processed = summary.processed,
                    failed = summary.failed,
                    skipped = summary.skipped,
                    "Payout batch committed"
                );
                Ok(summary)
            }
            Err(e) => {
                tracing::error!(run_id = %self.run_id, "Payout batch rolled back: {}", e);
                activity_log::record_detached(
                    pool,
                    SYSTEM_PAYOUT_ACTOR,
                    "payout_batch_failed",
                    json!({ "run_id": self.run_id, "error": e.to_string() }),
                )
                .await;
                Err(e)
            }
        }
    }

    async fn run_in_transaction(&self, pool: &DbPool) -> Result<PayoutSummary, AppError> {
        let mut tx = pool.begin().await?;

        match self.process(&mut tx).await {
            Ok(summary) => {
                tx.commit().await?;
                Ok(summary)
            }
            Err(e) => {
                if let Err(rollback_error) = tx.rollback().await {
                    tracing::error!("Rollback of payout batch failed: {}", rollback_error);
                }
                Err(e)
            }
        }
    }

    async fn process(&self, conn: &mut PgConnection) -> Result<PayoutSummary, AppError> {
        let eligible = fetch_eligible(&mut *conn, self.settings, self.now).await?;
        tracing::info!(run_id = %self.run_id, count = eligible.len(), "Eligible withdrawals locked");

        let mut summary = PayoutSummary::new(self.run_id);

        for withdrawal in &eligible {
            let resolution = self.call_gateway(withdrawal).await;
            let status = self.settle(&mut *conn, withdrawal, resolution).await?;
            summary.record(status);
        }

        activity_log::record(
            &mut *conn,
            SYSTEM_PAYOUT_ACTOR,
            "payout_batch_completed",
            json!({
                "run_id": self.run_id,
                "gateway": self.gateway.name(),
                "min_hours": self.settings.min_hours,
                "max_amount_cents": self.settings.max_amount_cents,
                "processed": summary.processed,
                "failed": summary.failed,
                "skipped": summary.skipped,
                "total": summary.total(),
            }),
        )
        .await?;

        Ok(summary)
    }

    /// Ask the gateway to pay one withdrawal. Never fails: every problem
    /// becomes a `Failed` resolution.
    async fn call_gateway(&self, withdrawal: &EligibleWithdrawal) -> PayoutResolution {
        let Some(destination) = withdrawal.destination() else {
            tracing::warn!(
                withdrawal_id = withdrawal.id,
                gym_id = withdrawal.gym_id,
                "Gym has no payout details for the requested method"
            );
            return PayoutResolution::failed(format!(
                "gym has no {} payout details on file",
                withdrawal.payment_method.as_str()
            ));
        };

        let instruction = PayoutInstruction {
            withdrawal_id: withdrawal.id,
            gym_id: withdrawal.gym_id,
            gym_name: withdrawal.gym_name.clone(),
            amount_cents: withdrawal.amount_cents,
            destination,
            reference: PayoutInstruction::reference_for(withdrawal.id),
        };

        let result = tokio::time::timeout(self.gateway_timeout, self.gateway.send_payout(&instruction))
            .await
            .unwrap_or_else(|_| Err(GatewayError::Timeout(self.gateway_timeout)));

        if let Err(ref e) = result {
            tracing::warn!(withdrawal_id = withdrawal.id, "Gateway call failed: {}", e);
        }

        PayoutResolution::from_gateway(result)
    }

    /// Write the resolution of one item inside a savepoint.
    ///
    /// Returns `Pending` when another run settled the item first.
    async fn settle(
        &self,
        conn: &mut PgConnection,
        withdrawal: &EligibleWithdrawal,
        resolution: PayoutResolution,
    ) -> Result<WithdrawalStatus, AppError> {
        let audit = AuditContext {
            actor: SYSTEM_PAYOUT_ACTOR,
            run_id: Some(self.run_id),
            error: None,
        };

        let mut savepoint = (&mut *conn).begin().await?;

        let outcome = apply_resolution(
            &mut savepoint,
            withdrawal.id,
            withdrawal.gym_id,
            withdrawal.amount_cents,
            &resolution,
            &audit,
        )
        .await;

        match outcome {
            Ok(status) => {
                savepoint.commit().await?;
                Ok(status)
            }
            Err(AppError::InvalidTransition(e)) => {
                savepoint.rollback().await?;
                tracing::warn!(withdrawal_id = withdrawal.id, "Skipping withdrawal: {}", e);
                Ok(WithdrawalStatus::Pending)
            }
            Err(e) => {
                savepoint.rollback().await?;
                tracing::warn!(
                    withdrawal_id = withdrawal.id,
                    "Recording payout result failed, marking it failed instead: {}",
                    e
                );

                let fallback = PayoutResolution::Failed {
                    reason: RECORDING_FAILED_REASON.to_string(),
                    transaction_id: resolution.transaction_id().map(str::to_string),
                };
                let audit = AuditContext {
                    error: Some(e.to_string()),
                    ..audit
                };

                // A second failure here is batch-level and aborts the run.
                let mut savepoint = (&mut *conn).begin().await?;
                let status = apply_resolution(
                    &mut savepoint,
                    withdrawal.id,
                    withdrawal.gym_id,
                    withdrawal.amount_cents,
                    &fallback,
                    &audit,
                )
                .await?;
                savepoint.commit().await?;
                Ok(status)
            }
        }
    }
}

/// Lock the withdrawals this run may pay out.
///
/// Completed and failed rows never match; rows locked by a concurrent run
/// are skipped rather than waited on.
async fn fetch_eligible(
    conn: &mut PgConnection,
    settings: &PayoutSettings,
    now: DateTime<Utc>,
) -> Result<Vec<EligibleWithdrawal>, AppError> {
    let rows = sqlx::query_as::<_, EligibleWithdrawal>(
        r#"
        SELECT w.id,
               w.gym_id,
               g.name AS gym_name,
               w.amount_cents,
               w.payment_method,
               w.created_at,
               g.bank_account_name,
               g.bank_account_number,
               g.bank_ifsc,
               g.upi_id
        FROM withdrawals w
        JOIN gyms g ON g.id = w.gym_id
        WHERE w.status = 'pending'
          AND w.created_at <= $1
          AND w.amount_cents <= $2
        ORDER BY w.created_at, w.id
        FOR UPDATE OF w SKIP LOCKED
        "#,
    )
    .bind(settings.eligibility_cutoff(now))
    .bind(settings.max_amount_cents)
    .fetch_all(conn)
    .await?;

    Ok(rows)
}

/// Apply a terminal transition and its side effects.
///
/// # Process
///
/// 1. Compare-and-swap the status from `pending`
/// 2. Store the transaction id and append the failure note
/// 3. Refund the gym balance on failure
/// 4. Write one activity entry and one gym notification
///
/// # Errors
///
/// - `InvalidTransition`: the withdrawal is no longer pending
/// - `WithdrawalNotFound` / `GymNotFound`
/// - `Database`
async fn apply_resolution(
    conn: &mut PgConnection,
    withdrawal_id: i64,
    gym_id: i64,
    amount_cents: i64,
    resolution: &PayoutResolution,
    audit: &AuditContext<'_>,
) -> Result<WithdrawalStatus, AppError> {
    let status = WithdrawalStatus::Pending.transition_to(resolution.status())?;

    let updated = sqlx::query(
        r#"
        UPDATE withdrawals
        SET status = $1,
            transaction_id = COALESCE($2, transaction_id),
            notes = CASE
                WHEN $3::text IS NULL THEN notes
                WHEN notes IS NULL OR notes = '' THEN $3
                ELSE notes || E'\n' || $3
            END,
            processed_at = NOW()
        WHERE id = $4 AND status = 'pending'
        "#,
    )
    .bind(status.as_str())
    .bind(resolution.transaction_id())
    .bind(resolution.note())
    .bind(withdrawal_id)
    .execute(&mut *conn)
    .await?
    .rows_affected();

    if updated == 0 {
        let current: Option<String> = sqlx::query_scalar("SELECT status FROM withdrawals WHERE id = $1")
            .bind(withdrawal_id)
            .fetch_optional(&mut *conn)
            .await?;

        return Err(match current {
            None => AppError::WithdrawalNotFound,
            Some(current) => StatusError::AlreadyProcessed(current.parse()?).into(),
        });
    }

    let refund_cents = resolution.refund_cents(amount_cents);
    if refund_cents > 0 {
        let refunded = sqlx::query(
            "UPDATE gyms SET balance_cents = balance_cents + $1, updated_at = NOW() WHERE id = $2",
        )
        .bind(refund_cents)
        .bind(gym_id)
        .execute(&mut *conn)
        .await?
        .rows_affected();

        if refunded == 0 {
            return Err(AppError::GymNotFound);
        }
    }

    let reason = match resolution {
        PayoutResolution::Completed { .. } => None,
        PayoutResolution::Failed { reason, .. } => Some(reason.as_str()),
    };

    activity_log::record(
        &mut *conn,
        audit.actor,
        resolution.audit_action(),
        json!({
            "withdrawal_id": withdrawal_id,
            "gym_id": gym_id,
            "amount_cents": amount_cents,
            "status": status.as_str(),
            "transaction_id": resolution.transaction_id(),
            "refunded_cents": refund_cents,
            "reason": reason,
            "run_id": audit.run_id,
            "error": audit.error,
        }),
    )
    .await?;

    let (title, message) = resolution.notification(amount_cents);
    notification_service::notify_gym(&mut *conn, gym_id, title, &message).await?;

    Ok(status)
}

/// Mark a pending withdrawal as paid (e.g. settled by bank transfer by hand).
pub async fn complete_withdrawal(
    pool: &DbPool,
    withdrawal_id: i64,
    request: CompleteWithdrawalRequest,
    actor: &str,
) -> Result<Withdrawal, AppError> {
    let transaction_id = request.transaction_id.trim();
    if transaction_id.is_empty() {
        return Err(AppError::InvalidRequest(
            "transaction_id must not be empty".to_string(),
        ));
    }

    let resolution = PayoutResolution::Completed {
        transaction_id: transaction_id.to_string(),
    };
    resolve_manually(pool, withdrawal_id, resolution, actor).await
}

/// Reject a pending withdrawal and refund the gym.
pub async fn fail_withdrawal(
    pool: &DbPool,
    withdrawal_id: i64,
    request: FailWithdrawalRequest,
    actor: &str,
) -> Result<Withdrawal, AppError> {
    let reason = request.reason.trim();
    if reason.is_empty() {
        return Err(AppError::InvalidRequest("reason must not be empty".to_string()));
    }

    resolve_manually(pool, withdrawal_id, PayoutResolution::failed(reason), actor).await
}

async fn resolve_manually(
    pool: &DbPool,
    withdrawal_id: i64,
    resolution: PayoutResolution,
    actor: &str,
) -> Result<Withdrawal, AppError> {
    let mut tx = pool.begin().await?;

    // Lock the row so an automatic run cannot settle it concurrently
    let withdrawal = sqlx::query_as::<_, Withdrawal>("SELECT * FROM withdrawals WHERE id = $1 FOR UPDATE")
        .bind(withdrawal_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::WithdrawalNotFound)?;

    withdrawal.status.transition_to(resolution.status())?;

    apply_resolution(
        &mut tx,
        withdrawal.id,
        withdrawal.gym_id,
        withdrawal.amount_cents,
        &resolution,
        &AuditContext::manual(actor),
    )
    .await?;

    let updated = sqlx::query_as::<_, Withdrawal>("SELECT * FROM withdrawals WHERE id = $1")
        .bind(withdrawal_id)
        .fetch_one(&mut *tx)
        .await?;

    tx.commit().await?;

    tracing::info!(
        withdrawal_id,
        actor,
        status = %updated.status,
        "Withdrawal resolved manually"
    );

    Ok(updated)
}

/// Get withdrawal by ID.
pub async fn get_withdrawal(pool: &DbPool, withdrawal_id: i64) -> Result<Withdrawal, AppError> {
    sqlx::query_as::<_, Withdrawal>("SELECT * FROM withdrawals WHERE id = $1")
        .bind(withdrawal_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::WithdrawalNotFound)
}

/// List withdrawals, newest first, optionally filtered by status and gym.
pub async fn list_withdrawals(
    pool: &DbPool,
    query: &ListWithdrawalsQuery,
) -> Result<Vec<Withdrawal>, AppError> {
    let withdrawals = sqlx::query_as::<_, Withdrawal>(
        r#"
        SELECT * FROM withdrawals
        WHERE ($1::text IS NULL OR status = $1)
          AND ($2::bigint IS NULL OR gym_id = $2)
        ORDER BY created_at DESC, id DESC
        LIMIT $3
        "#,
    )
    .bind(query.status.map(WithdrawalStatus::as_str))
    .bind(query.gym_id)
    .bind(query.limit.clamp(1, 500))
    .fetch_all(pool)
    .await?;

    Ok(withdrawals)
}
