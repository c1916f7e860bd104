//! Payout settings endpoints.
//!
//! - GET /api/v1/settings/payouts - Current payout settings
//! - PUT /api/v1/settings/payouts - Replace payout settings

use crate::{
    db::DbPool,
    error::AppError,
    middleware::auth::AuthContext,
    models::settings::{PayoutSettings, UpdatePayoutSettingsRequest, format_amount},
    services::settings_service,
};
use axum::{Extension, Json, extract::State};
use serde::Serialize;

/// Settings as shown to administrators (amount in major units).
#[derive(Debug, Serialize)]
pub struct PayoutSettingsResponse {
    pub enabled: bool,
    pub min_hours: i64,
    pub max_amount: String,
    pub gateway: &'static str,
}

impl From<PayoutSettings> for PayoutSettingsResponse {
    fn from(settings: PayoutSettings) -> Self {
        Self {
            enabled: settings.enabled,
            min_hours: settings.min_hours,
            max_amount: format_amount(settings.max_amount_cents),
            gateway: settings.gateway.as_str(),
        }
    }
}

/// Get the payout settings.
///
/// # Endpoint
///
/// `GET /api/v1/settings/payouts`
///
/// # Response
///
/// - **Success (200 OK)**: the settings
/// - **Error (422)**: stored settings are missing or malformed
pub async fn get_payout_settings(
    State(pool): State<DbPool>,
) -> Result<Json<PayoutSettingsResponse>, AppError> {
    let settings = settings_service::load_payout_settings(&pool).await?;
    Ok(Json(settings.into()))
}

/// Replace the payout settings.
///
/// # Endpoint
///
/// `PUT /api/v1/settings/payouts`
///
/// # Request Body
///
/// ```json
/// { "enabled": true, "min_hours": 24, "max_amount": "5000", "gateway": "http" }
/// ```
///
/// # Response
///
/// - **Success (200 OK)**: the stored settings
/// - **Error (422)**: a value failed validation
pub async fn update_payout_settings(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<UpdatePayoutSettingsRequest>,
) -> Result<Json<PayoutSettingsResponse>, AppError> {
    let settings = settings_service::update_payout_settings(&pool, request, &auth.actor()).await?;
    Ok(Json(settings.into()))
}
