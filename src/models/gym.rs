//! Gym data models and API response types.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Represents a gym record from the database.
///
/// # Database Table
///
/// Maps to the `gyms` table. The balance is what the gym can still withdraw:
/// - debited when the gym owner requests a withdrawal (outside this service)
/// - credited back when a payout fails
/// - credited with the gym's share of distributed visit revenue
///
/// Balances are stored as `i64` minor units and must be >= 0 (enforced by a
/// database CHECK constraint).
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Gym {
    pub id: i64,
    pub name: String,
    pub owner_email: Option<String>,
    pub balance_cents: i64,
    pub bank_account_name: Option<String>,
    pub bank_account_number: Option<String>,
    pub bank_ifsc: Option<String>,
    pub upi_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Response body for gym endpoints.
///
/// Bank account numbers are masked to their last four digits.
#[derive(Debug, Serialize)]
pub struct GymResponse {
    pub id: i64,
    pub name: String,
    pub balance_cents: i64,
    pub bank_account_last4: Option<String>,
    pub upi_id: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl From<Gym> for GymResponse {
    fn from(gym: Gym) -> Self {
        Self {
            id: gym.id,
            name: gym.name,
            balance_cents: gym.balance_cents,
            bank_account_last4: gym.bank_account_number.as_deref().map(last_four),
            upi_id: gym.upi_id,
            updated_at: gym.updated_at,
        }
    }
}

fn last_four(number: &str) -> String {
    let digits: Vec<char> = number.chars().filter(|c| !c.is_whitespace()).collect();
    let start = digits.len().saturating_sub(4);
    digits[start..].iter().collect()
}

/// A notification shown to the gym owner.
///
/// # Database Table
///
/// Maps to the `gym_notifications` table. Read-state is managed by the
/// owner-facing app.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct GymNotification {
    pub id: i64,
    pub gym_id: i64,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}
