//! Settings Store access.

use std::collections::HashMap;

use serde_json::json;

use crate::{
    db::DbPool,
    error::AppError,
    models::settings::{PAYOUT_KEYS, PayoutSettings, UpdatePayoutSettingsRequest, format_amount},
    services::activity_log,
};

/// Read the payout settings once for a run.
///
/// # Errors
///
/// - `Database`: the table could not be read
/// - `Settings`: a key is missing or holds an invalid value
pub async fn load_payout_settings(pool: &DbPool) -> Result<PayoutSettings, AppError> {
    let rows: Vec<(String, String)> = sqlx::query_as(
        "SELECT setting_key, setting_value FROM system_settings WHERE setting_key = ANY($1)",
    )
    .bind(&PAYOUT_KEYS[..])
    .fetch_all(pool)
    .await?;

    let values: HashMap<String, String> = rows.into_iter().collect();

    Ok(PayoutSettings::from_map(&values)?)
}

/// Validate and store new payout settings (last write wins).
pub async fn update_payout_settings(
    pool: &DbPool,
    request: UpdatePayoutSettingsRequest,
    actor: &str,
) -> Result<PayoutSettings, AppError> {
    let settings = request.validate()?;

    let mut tx = pool.begin().await?;

    for (key, value) in settings.to_pairs() {
        sqlx::query(
            r#"
            INSERT INTO system_settings (setting_key, setting_value, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (setting_key)
            DO UPDATE SET setting_value = EXCLUDED.setting_value, updated_at = NOW()
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&mut *tx)
        .await?;
    }

    activity_log::record(
        &mut *tx,
        actor,
        "payout_settings_updated",
        json!({
            "enabled": settings.enabled,
            "min_hours": settings.min_hours,
            "max_amount": format_amount(settings.max_amount_cents),
            "gateway": settings.gateway.as_str(),
        }),
    )
    .await?;

    tx.commit().await?;

    tracing::info!(actor, "Payout settings updated");

    Ok(settings)
}
