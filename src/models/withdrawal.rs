//! Withdrawal data models and API request/response types.
//!
//! This module defines:
//! - `WithdrawalStatus`: the three-state payout lifecycle
//! - `Withdrawal`: Database entity representing a payout request
//! - `EligibleWithdrawal`: a pending request joined with its gym's payout details
//! - Request types for manual completion and failure

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of a withdrawal.
///
/// `Pending` is the only non-terminal state. A withdrawal leaves it exactly
/// once, either to `Completed` or to `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WithdrawalStatus {
    Pending,
    Completed,
    Failed,
}

/// Rejected status transition.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StatusError {
    #[error("withdrawal is already {0}")]
    AlreadyProcessed(WithdrawalStatus),

    #[error("a withdrawal cannot move back to pending")]
    BackToPending,

    #[error("unknown withdrawal status '{0}'")]
    Unknown(String),
}

impl WithdrawalStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            WithdrawalStatus::Pending => "pending",
            WithdrawalStatus::Completed => "completed",
            WithdrawalStatus::Failed => "failed",
        }
    }

    /// Validate a transition from `self` to `next`.
    pub fn transition_to(self, next: WithdrawalStatus) -> Result<WithdrawalStatus, StatusError> {
        match (self, next) {
            (WithdrawalStatus::Pending, WithdrawalStatus::Completed)
            | (WithdrawalStatus::Pending, WithdrawalStatus::Failed) => Ok(next),
            (_, WithdrawalStatus::Pending) => Err(StatusError::BackToPending),
            (current @ WithdrawalStatus::Completed, _) | (current @ WithdrawalStatus::Failed, _) => {
                Err(StatusError::AlreadyProcessed(current))
            }
        }
    }
}

impl std::fmt::Display for WithdrawalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for WithdrawalStatus {
    type Err = StatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(WithdrawalStatus::Pending),
            "completed" => Ok(WithdrawalStatus::Completed),
            "failed" => Ok(WithdrawalStatus::Failed),
            other => Err(StatusError::Unknown(other.to_string())),
        }
    }
}

impl TryFrom<String> for WithdrawalStatus {
    type Error = StatusError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// How the gym wants to receive the money.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    BankTransfer,
    Upi,
}

impl PaymentMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::Upi => "upi",
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown payment method '{0}'")]
pub struct UnknownPaymentMethod(String);

impl TryFrom<String> for PaymentMethod {
    type Error = UnknownPaymentMethod;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "bank_transfer" => Ok(PaymentMethod::BankTransfer),
            "upi" => Ok(PaymentMethod::Upi),
            _ => Err(UnknownPaymentMethod(value)),
        }
    }
}

/// Represents a withdrawal record from the database.
///
/// # Database Table
///
/// Maps to the `withdrawals` table. The gym balance was already debited by
/// `amount_cents` when the row was created.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Withdrawal {
    pub id: i64,
    pub gym_id: i64,
    pub amount_cents: i64,
    #[sqlx(try_from = "String")]
    pub payment_method: PaymentMethod,
    #[sqlx(try_from = "String")]
    pub status: WithdrawalStatus,
    /// Gateway (or manual) reference, set once the payout completes
    pub transaction_id: Option<String>,
    /// Free-form processing notes; failure reasons are appended here
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

/// A pending withdrawal joined with the payout details of its gym.
///
/// This is the row shape returned by the eligibility query.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EligibleWithdrawal {
    pub id: i64,
    pub gym_id: i64,
    pub gym_name: String,
    pub amount_cents: i64,
    #[sqlx(try_from = "String")]
    pub payment_method: PaymentMethod,
    pub created_at: DateTime<Utc>,
    pub bank_account_name: Option<String>,
    pub bank_account_number: Option<String>,
    pub bank_ifsc: Option<String>,
    pub upi_id: Option<String>,
}

/// Where the gateway should send the money.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum PayoutDestination {
    BankTransfer {
        account_name: String,
        account_number: String,
        ifsc: String,
    },
    Upi {
        vpa: String,
    },
}

impl EligibleWithdrawal {
    /// Build the payout destination from the gym's stored details.
    ///
    /// Returns `None` when the gym has not filled in the details the chosen
    /// payment method needs; the executor fails such requests.
    pub fn destination(&self) -> Option<PayoutDestination> {
        fn present(value: &Option<String>) -> Option<String> {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        }

        match self.payment_method {
            PaymentMethod::BankTransfer => Some(PayoutDestination::BankTransfer {
                account_name: present(&self.bank_account_name)?,
                account_number: present(&self.bank_account_number)?,
                ifsc: present(&self.bank_ifsc)?,
            }),
            PaymentMethod::Upi => Some(PayoutDestination::Upi {
                vpa: present(&self.upi_id)?,
            }),
        }
    }
}

/// Query string for listing withdrawals.
#[derive(Debug, Deserialize)]
pub struct ListWithdrawalsQuery {
    pub status: Option<WithdrawalStatus>,
    pub gym_id: Option<i64>,
    #[serde(default = "default_list_limit")]
    pub limit: i64,
}

fn default_list_limit() -> i64 {
    100
}

/// Request to mark a withdrawal as paid outside the automatic run.
///
/// # JSON Example
///
/// ```json
/// { "transaction_id": "UTR123456789" }
/// ```
#[derive(Debug, Deserialize)]
pub struct CompleteWithdrawalRequest {
    pub transaction_id: String,
}

/// Request to reject a withdrawal and refund the gym.
///
/// # JSON Example
///
/// ```json
/// { "reason": "Bank account closed" }
/// ```
#[derive(Debug, Deserialize)]
pub struct FailWithdrawalRequest {
    pub reason: String,
}
