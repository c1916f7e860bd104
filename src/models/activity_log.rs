//! Audit trail entries.
//!
//! Every state change made by a payout run, a revenue run, or an
//! administrator is appended to `activity_logs`. Rows are never updated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Actor recorded for unattended payout runs.
pub const SYSTEM_PAYOUT_ACTOR: &str = "system:auto_payout";

/// Actor recorded for unattended revenue runs.
pub const SYSTEM_REVENUE_ACTOR: &str = "system:revenue";

/// Represents an activity log record from the database.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct ActivityLogEntry {
    pub id: i64,
    /// Admin name, or one of the `system:*` actors
    pub actor: String,
    /// Machine-readable action, e.g. `payout_completed`
    pub action: String,
    pub details: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Query string for listing activity logs.
#[derive(Debug, Deserialize)]
pub struct ActivityLogQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    pub action: Option<String>,
}

fn default_limit() -> i64 {
    50
}
