//! Payment gateways that move money to gyms.
//!
//! The payout run only talks to the [`PaymentGateway`] trait. Which
//! implementation it gets is decided per run from the `payment_gateway`
//! setting (see [`build_gateway`]).

pub mod http;
pub mod manual;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::models::settings::{GatewayKind, SettingsError};
use crate::models::withdrawal::PayoutDestination;

/// Everything a gateway needs to send one payout.
#[derive(Debug, Clone, Serialize)]
pub struct PayoutInstruction {
    pub withdrawal_id: i64,
    pub gym_id: i64,
    pub gym_name: String,
    pub amount_cents: i64,
    pub destination: PayoutDestination,
    /// Stable per withdrawal; gateways use it to deduplicate retries
    pub reference: String,
}

impl PayoutInstruction {
    pub fn reference_for(withdrawal_id: i64) -> String {
        format!("withdrawal-{withdrawal_id}")
    }
}

/// What the gateway reported for one payout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayOutcome {
    pub success: bool,
    #[serde(default)]
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Anything that kept the gateway from giving a definite answer.
///
/// The payout run treats every variant exactly like `success = false`.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("gateway did not respond within {0:?}")]
    Timeout(Duration),

    #[error("gateway request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("gateway rejected the request with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("gateway returned an unreadable response: {0}")]
    InvalidResponse(String),
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Short name recorded in audit entries.
    fn name(&self) -> &'static str;

    async fn send_payout(&self, instruction: &PayoutInstruction) -> Result<GatewayOutcome, GatewayError>;
}

/// Build the gateway selected by the run's settings.
///
/// # Errors
///
/// `SettingsError::GatewayNotConfigured` when the HTTP gateway is selected but
/// `GATEWAY_BASE_URL` / `GATEWAY_SECRET` are missing or the URL is invalid.
pub fn build_gateway(kind: GatewayKind, config: &Config) -> Result<Arc<dyn PaymentGateway>, SettingsError> {
    match kind {
        GatewayKind::Manual => Ok(Arc::new(manual::ManualGateway)),
        GatewayKind::Http => {
            let (Some(base_url), Some(secret)) = (&config.gateway_base_url, &config.gateway_secret)
            else {
                return Err(SettingsError::GatewayNotConfigured(kind.as_str()));
            };

            let gateway = http::HttpGateway::new(base_url, secret, config.gateway_timeout())
                .map_err(|e| {
                    tracing::error!("HTTP gateway configuration rejected: {}", e);
                    SettingsError::GatewayNotConfigured(kind.as_str())
                })?;

            Ok(Arc::new(gateway))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(base_url: Option<&str>, secret: Option<&str>) -> Config {
        Config {
            database_url: "postgres://localhost/gym".to_string(),
            server_port: 3000,
            database_max_connections: 5,
            gateway_base_url: base_url.map(str::to_string),
            gateway_secret: secret.map(str::to_string),
            gateway_timeout_secs: 30,
        }
    }

    #[test]
    fn manual_gateway_needs_no_configuration() {
        let gateway = build_gateway(GatewayKind::Manual, &config(None, None)).unwrap();
        assert_eq!(gateway.name(), "manual");
    }

    #[test]
    fn http_gateway_requires_url_and_secret() {
        let missing_secret = build_gateway(
            GatewayKind::Http,
            &config(Some("https://pay.example.com"), None),
        );
        assert!(matches!(
            missing_secret,
            Err(SettingsError::GatewayNotConfigured("http"))
        ));

        let bad_url = build_gateway(GatewayKind::Http, &config(Some("not a url"), Some("s")));
        assert!(bad_url.is_err());

        let ok = build_gateway(
            GatewayKind::Http,
            &config(Some("https://pay.example.com"), Some("s3cret")),
        )
        .unwrap();
        assert_eq!(ok.name(), "http");
    }
}
