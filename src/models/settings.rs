//! Payout settings read from the `system_settings` key/value table.
//!
//! The table is a flat, last-write-wins map edited from the admin API. A run
//! reads it once and works from the resulting [`PayoutSettings`] value; it is
//! never consulted again mid-run.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

pub const KEY_ENABLED: &str = "auto_payout_enabled";
pub const KEY_MIN_HOURS: &str = "auto_payout_min_hours";
pub const KEY_MAX_AMOUNT: &str = "auto_payout_max_amount";
pub const KEY_GATEWAY: &str = "payment_gateway";

/// Every key a payout run needs.
pub const PAYOUT_KEYS: [&str; 4] = [KEY_ENABLED, KEY_MIN_HOURS, KEY_MAX_AMOUNT, KEY_GATEWAY];

/// Which gateway moves the money.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayKind {
    /// Signed JSON POST to `GATEWAY_BASE_URL`
    Http,
    /// Offline settlement; the run records a generated reference
    Manual,
}

impl GatewayKind {
    pub fn as_str(self) -> &'static str {
        match self {
            GatewayKind::Http => "http",
            GatewayKind::Manual => "manual",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("setting '{0}' is missing")]
    Missing(&'static str),

    #[error("setting '{key}' has invalid value '{value}'")]
    Invalid { key: &'static str, value: String },

    #[error("payment gateway '{0}' is not configured")]
    GatewayNotConfigured(&'static str),
}

/// Thresholds for one payout run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PayoutSettings {
    pub enabled: bool,
    /// Minimum age of a request, in hours, before it may be paid out
    pub min_hours: i64,
    /// Largest request paid out automatically, in minor units
    pub max_amount_cents: i64,
    pub gateway: GatewayKind,
}

impl PayoutSettings {
    /// Build settings from raw key/value rows.
    ///
    /// Every key in [`PAYOUT_KEYS`] must be present; the migration seeds them.
    pub fn from_map(values: &HashMap<String, String>) -> Result<Self, SettingsError> {
        let get = |key: &'static str| {
            values
                .get(key)
                .map(|v| v.trim())
                .ok_or(SettingsError::Missing(key))
        };

        let enabled = parse_flag(KEY_ENABLED, get(KEY_ENABLED)?)?;

        let raw_hours = get(KEY_MIN_HOURS)?;
        let min_hours = raw_hours
            .parse::<i64>()
            .ok()
            .filter(|h| (0..=24 * 365).contains(h))
            .ok_or_else(|| invalid(KEY_MIN_HOURS, raw_hours))?;

        let raw_max = get(KEY_MAX_AMOUNT)?;
        let max_amount_cents = parse_amount_cents(raw_max)
            .filter(|cents| *cents > 0)
            .ok_or_else(|| invalid(KEY_MAX_AMOUNT, raw_max))?;

        let raw_gateway = get(KEY_GATEWAY)?;
        let gateway = match raw_gateway.to_ascii_lowercase().as_str() {
            "http" => GatewayKind::Http,
            "manual" => GatewayKind::Manual,
            _ => return Err(invalid(KEY_GATEWAY, raw_gateway)),
        };

        Ok(Self {
            enabled,
            min_hours,
            max_amount_cents,
            gateway,
        })
    }

    /// Serialize back into the key/value representation stored in the table.
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            (KEY_ENABLED, if self.enabled { "1" } else { "0" }.to_string()),
            (KEY_MIN_HOURS, self.min_hours.to_string()),
            (KEY_MAX_AMOUNT, format_amount(self.max_amount_cents)),
            (KEY_GATEWAY, self.gateway.as_str().to_string()),
        ]
    }

    /// Requests created at or before this instant are old enough to pay out.
    pub fn eligibility_cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - Duration::hours(self.min_hours)
    }
}

/// Admin request body for `PUT /api/v1/settings/payouts`.
///
/// # JSON Example
///
/// ```json
/// { "enabled": true, "min_hours": 24, "max_amount": "5000", "gateway": "http" }
/// ```
#[derive(Debug, Deserialize)]
pub struct UpdatePayoutSettingsRequest {
    pub enabled: bool,
    pub min_hours: i64,
    /// Decimal amount in major units
    pub max_amount: String,
    pub gateway: GatewayKind,
}

impl UpdatePayoutSettingsRequest {
    pub fn validate(self) -> Result<PayoutSettings, SettingsError> {
        let mut values = HashMap::new();
        values.insert(
            KEY_ENABLED.to_string(),
            if self.enabled { "1" } else { "0" }.to_string(),
        );
        values.insert(KEY_MIN_HOURS.to_string(), self.min_hours.to_string());
        values.insert(KEY_MAX_AMOUNT.to_string(), self.max_amount);
        values.insert(KEY_GATEWAY.to_string(), self.gateway.as_str().to_string());
        PayoutSettings::from_map(&values)
    }
}

fn invalid(key: &'static str, value: &str) -> SettingsError {
    SettingsError::Invalid {
        key,
        value: value.to_string(),
    }
}

fn parse_flag(key: &'static str, value: &str) -> Result<bool, SettingsError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(invalid(key, value)),
    }
}

/// Parse a decimal amount in major units ("5000", "5000.5", "5000.50") into
/// minor units. At most two fractional digits; negative values are rejected.
pub fn parse_amount_cents(value: &str) -> Option<i64> {
    let value = value.trim();
    let (whole, fraction) = match value.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (value, ""),
    };

    if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if fraction.len() > 2 || !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let whole: i64 = whole.parse().ok()?;
    let fraction: i64 = match fraction.len() {
        0 => 0,
        1 => fraction.parse::<i64>().ok()? * 10,
        _ => fraction.parse().ok()?,
    };

    whole.checked_mul(100)?.checked_add(fraction)
}

/// Format minor units as a decimal amount in major units ("3000.00").
pub fn format_amount(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}
