//! Cut-off chart HTTP handlers.
//!
//! This module implements the cut-off rule endpoints:
//! - GET /api/v1/cutoff-rules - List the chart
//! - POST /api/v1/cutoff-rules - Add a rule
//! - DELETE /api/v1/cutoff-rules/:id - Remove a rule

use crate::{
    db::DbPool,
    error::AppError,
    middleware::auth::AuthContext,
    models::revenue::{CreateCutoffRuleRequest, CutoffRule},
    services::revenue_service,
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};

pub async fn list_rules(State(pool): State<DbPool>) -> Result<Json<Vec<CutoffRule>>, AppError> {
    let rules = revenue_service::list_rules(&pool).await?;
    Ok(Json(rules))
}

/// Add a cut-off rule.
///
/// # Request Body
///
/// ```json
/// { "label": "Standard", "min_amount_cents": 0, "max_amount_cents": 49999, "admin_share_bps": 2000 }
/// ```
///
/// # Response
///
/// - **Success (201 Created)**: the stored rule
/// - **Error (400)**: invalid range or share
pub async fn create_rule(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<CreateCutoffRuleRequest>,
) -> Result<(StatusCode, Json<CutoffRule>), AppError> {
    let rule = revenue_service::create_rule(&pool, request, &auth.actor()).await?;
    Ok((StatusCode::CREATED, Json(rule)))
}

/// Remove a cut-off rule.
///
/// # Response
///
/// - **Success (204 No Content)**
/// - **Error (404)**: no such rule
pub async fn delete_rule(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(rule_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    revenue_service::delete_rule(&pool, rule_id, &auth.actor()).await?;
    Ok(StatusCode::NO_CONTENT)
}
