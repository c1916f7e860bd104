//! Payout run results.
//!
//! - `PayoutResolution`: what happens to one withdrawal after the gateway answered
//! - `PayoutSummary`: counters for a whole run

use serde::Serialize;
use uuid::Uuid;

use crate::gateway::{GatewayError, GatewayOutcome};
use crate::models::settings::format_amount;
use crate::models::withdrawal::WithdrawalStatus;

pub const TITLE_COMPLETED: &str = "Payout Processed";
pub const TITLE_FAILED: &str = "Payout Processing Failed";

/// Terminal transition to apply to a pending withdrawal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayoutResolution {
    /// Money left; the gym balance stays debited.
    Completed { transaction_id: String },
    /// Money did not leave; the amount goes back to the gym balance.
    ///
    /// A gateway reference is kept when one exists so finance can reconcile.
    Failed {
        reason: String,
        transaction_id: Option<String>,
    },
}

impl PayoutResolution {
    /// Interpret a gateway answer.
    ///
    /// Errors of any kind count as failures. A success without a transaction
    /// id is also a failure: a completed payout must be traceable.
    pub fn from_gateway(result: Result<GatewayOutcome, GatewayError>) -> Self {
        match result {
            Ok(GatewayOutcome {
                success: true,
                transaction_id: Some(transaction_id),
                ..
            }) if !transaction_id.trim().is_empty() => PayoutResolution::Completed { transaction_id },
            Ok(GatewayOutcome { success: true, .. }) => PayoutResolution::Failed {
                reason: "gateway reported success without a transaction id".to_string(),
                transaction_id: None,
            },
            Ok(GatewayOutcome {
                success: false,
                transaction_id,
                message,
            }) => PayoutResolution::Failed {
                reason: message
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| "gateway declined the payout".to_string()),
                transaction_id,
            },
            Err(e) => PayoutResolution::Failed {
                reason: e.to_string(),
                transaction_id: None,
            },
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        PayoutResolution::Failed {
            reason: reason.into(),
            transaction_id: None,
        }
    }

    pub fn status(&self) -> WithdrawalStatus {
        match self {
            PayoutResolution::Completed { .. } => WithdrawalStatus::Completed,
            PayoutResolution::Failed { .. } => WithdrawalStatus::Failed,
        }
    }

    pub fn transaction_id(&self) -> Option<&str> {
        match self {
            PayoutResolution::Completed { transaction_id } => Some(transaction_id),
            PayoutResolution::Failed { transaction_id, .. } => transaction_id.as_deref(),
        }
    }

    /// Amount to credit back to the gym balance.
    pub fn refund_cents(&self, amount_cents: i64) -> i64 {
        match self {
            PayoutResolution::Completed { .. } => 0,
            PayoutResolution::Failed { .. } => amount_cents,
        }
    }

    /// Line appended to the withdrawal's notes, if any.
    pub fn note(&self) -> Option<String> {
        match self {
            PayoutResolution::Completed { .. } => None,
            PayoutResolution::Failed { reason, .. } => Some(format!("Payout failed: {reason}")),
        }
    }

    pub fn audit_action(&self) -> &'static str {
        match self {
            PayoutResolution::Completed { .. } => "payout_completed",
            PayoutResolution::Failed { .. } => "payout_failed",
        }
    }

    /// Title and message of the gym notification.
    pub fn notification(&self, amount_cents: i64) -> (&'static str, String) {
        let amount = format_amount(amount_cents);
        match self {
            PayoutResolution::Completed { transaction_id } => (
                TITLE_COMPLETED,
                format!("Your payout of {amount} has been processed. Transaction ID: {transaction_id}."),
            ),
            PayoutResolution::Failed { reason, .. } => (
                TITLE_FAILED,
                format!(
                    "Your payout of {amount} could not be processed ({reason}). \
                     The amount has been credited back to your balance."
                ),
            ),
        }
    }
}

/// Counters for one payout run.
///
/// `Display` renders the summary line printed by the `auto_payouts` binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PayoutSummary {
    pub run_id: Uuid,
    pub processed: u32,
    pub failed: u32,
    /// Items another run resolved first (lost status compare-and-swap)
    pub skipped: u32,
}

impl PayoutSummary {
    pub fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            processed: 0,
            failed: 0,
            skipped: 0,
        }
    }

    pub fn total(&self) -> u32 {
        self.processed + self.failed
    }

    pub fn record(&mut self, status: WithdrawalStatus) {
        match status {
            WithdrawalStatus::Completed => self.processed += 1,
            WithdrawalStatus::Failed => self.failed += 1,
            WithdrawalStatus::Pending => self.skipped += 1,
        }
    }
}

impl std::fmt::Display for PayoutSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Processed: {}, Failed: {}, Total: {}",
            self.processed,
            self.failed,
            self.total()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn success_with_reference_completes() {
        let resolution = PayoutResolution::from_gateway(Ok(GatewayOutcome {
            success: true,
            transaction_id: Some("pout_9".to_string()),
            message: None,
        }));

        assert_eq!(
            resolution,
            PayoutResolution::Completed {
                transaction_id: "pout_9".to_string()
            }
        );
        assert_eq!(resolution.status(), WithdrawalStatus::Completed);
        assert_eq!(resolution.refund_cents(100_000), 0);
        assert_eq!(resolution.note(), None);
    }

    #[test]
    fn success_without_reference_fails() {
        let resolution = PayoutResolution::from_gateway(Ok(GatewayOutcome {
            success: true,
            transaction_id: Some(" ".to_string()),
            message: None,
        }));

        assert_eq!(resolution.status(), WithdrawalStatus::Failed);
        assert_eq!(resolution.refund_cents(100_000), 100_000);
    }

    #[test]
    fn declared_failure_keeps_gateway_message_and_reference() {
        let resolution = PayoutResolution::from_gateway(Ok(GatewayOutcome {
            success: false,
            transaction_id: Some("pout_10".to_string()),
            message: Some("beneficiary account frozen".to_string()),
        }));

        assert_eq!(resolution.transaction_id(), Some("pout_10"));
        assert_eq!(
            resolution.note().as_deref(),
            Some("Payout failed: beneficiary account frozen")
        );
    }

    #[test]
    fn timeout_is_treated_as_failure() {
        let resolution =
            PayoutResolution::from_gateway(Err(GatewayError::Timeout(Duration::from_secs(30))));

        assert_eq!(resolution.status(), WithdrawalStatus::Failed);
        assert_eq!(resolution.refund_cents(100_000), 100_000);
        assert_eq!(resolution.audit_action(), "payout_failed");

        let (title, message) = resolution.notification(100_000);
        assert_eq!(title, "Payout Processing Failed");
        assert!(message.contains("1000.00"));
        assert!(message.contains("credited back"));
    }

    #[test]
    fn summary_line_format() {
        let mut summary = PayoutSummary::new(Uuid::nil());
        summary.record(WithdrawalStatus::Completed);
        summary.record(WithdrawalStatus::Completed);
        summary.record(WithdrawalStatus::Failed);
        summary.record(WithdrawalStatus::Pending);

        assert_eq!(summary.to_string(), "Processed: 2, Failed: 1, Total: 3");
        assert_eq!(summary.skipped, 1);
        assert_eq!(
            PayoutSummary::new(Uuid::nil()).to_string(),
            "Processed: 0, Failed: 0, Total: 0"
        );
    }
}
