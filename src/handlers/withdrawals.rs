//! Withdrawal HTTP handlers.
//!
//! This module implements the withdrawal endpoints:
//! - GET /api/v1/withdrawals - List withdrawals (filter by status / gym)
//! - GET /api/v1/withdrawals/:id - Get withdrawal by ID
//! - POST /api/v1/withdrawals/:id/complete - Mark as paid manually
//! - POST /api/v1/withdrawals/:id/fail - Reject and refund

use crate::{
    db::DbPool,
    error::AppError,
    middleware::auth::AuthContext,
    models::withdrawal::{
        CompleteWithdrawalRequest, FailWithdrawalRequest, ListWithdrawalsQuery, Withdrawal,
    },
    services::payout_service,
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};

/// List withdrawals, newest first.
///
/// # Endpoint
///
/// `GET /api/v1/withdrawals?status=pending&gym_id=7&limit=50`
///
/// All query parameters are optional; `limit` defaults to 100.
pub async fn list_withdrawals(
    State(pool): State<DbPool>,
    Query(query): Query<ListWithdrawalsQuery>,
) -> Result<Json<Vec<Withdrawal>>, AppError> {
    let withdrawals = payout_service::list_withdrawals(&pool, &query).await?;
    Ok(Json(withdrawals))
}

/// Get a withdrawal by ID.
///
/// # Response
///
/// - **Success (200 OK)**: the withdrawal
/// - **Error (404)**: no such withdrawal
pub async fn get_withdrawal(
    State(pool): State<DbPool>,
    Path(withdrawal_id): Path<i64>,
) -> Result<Json<Withdrawal>, AppError> {
    let withdrawal = payout_service::get_withdrawal(&pool, withdrawal_id).await?;
    Ok(Json(withdrawal))
}

/// Mark a pending withdrawal as completed.
///
/// # Endpoint
///
/// `POST /api/v1/withdrawals/:id/complete`
///
/// # Request Body
///
/// ```json
/// { "transaction_id": "UTR123456789" }
/// ```
///
/// # Response
///
/// - **Success (200 OK)**: the updated withdrawal
/// - **Error (400)**: empty transaction id
/// - **Error (404)**: no such withdrawal
/// - **Error (409)**: the withdrawal is no longer pending
pub async fn complete_withdrawal(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(withdrawal_id): Path<i64>,
    Json(request): Json<CompleteWithdrawalRequest>,
) -> Result<Json<Withdrawal>, AppError> {
    let withdrawal =
        payout_service::complete_withdrawal(&pool, withdrawal_id, request, &auth.actor()).await?;
    Ok(Json(withdrawal))
}

/// Mark a pending withdrawal as failed and refund the gym.
///
/// # Endpoint
///
/// `POST /api/v1/withdrawals/:id/fail`
///
/// # Request Body
///
/// ```json
/// { "reason": "Bank account closed" }
/// ```
///
/// Error responses match [`complete_withdrawal`].
pub async fn fail_withdrawal(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(withdrawal_id): Path<i64>,
    Json(request): Json<FailWithdrawalRequest>,
) -> Result<Json<Withdrawal>, AppError> {
    let withdrawal =
        payout_service::fail_withdrawal(&pool, withdrawal_id, request, &auth.actor()).await?;
    Ok(Json(withdrawal))
}
