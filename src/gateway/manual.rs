//! Manual gateway.
//!
//! Used when the finance team settles payouts offline (bank portal, UPI app).
//! The run marks each eligible request completed with a generated
//! `MANUAL-<16 hex>` reference that the team quotes when paying.

use async_trait::async_trait;

use super::{GatewayError, GatewayOutcome, PaymentGateway, PayoutInstruction};

pub struct ManualGateway;

#[async_trait]
impl PaymentGateway for ManualGateway {
    fn name(&self) -> &'static str {
        "manual"
    }

    async fn send_payout(&self, instruction: &PayoutInstruction) -> Result<GatewayOutcome, GatewayError> {
        let reference = generate_reference();
        tracing::info!(
            withdrawal_id = instruction.withdrawal_id,
            reference = %reference,
            "Payout queued for manual settlement"
        );

        Ok(GatewayOutcome {
            success: true,
            transaction_id: Some(reference),
            message: Some("queued for manual settlement".to_string()),
        })
    }
}

/// `MANUAL-` followed by 16 hex characters (8 random bytes).
fn generate_reference() -> String {
    let bytes: [u8; 8] = rand::random();
    format!("MANUAL-{}", hex::encode_upper(bytes))
}
