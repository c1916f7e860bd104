//! HTTP payment gateway.
//!
//! Sends each payout as a signed JSON POST to `{GATEWAY_BASE_URL}/payouts`.
//!
//! # Headers Sent
//!
//! - `Content-Type: application/json`
//! - `X-Payout-Signature: sha256=<hex>` (HMAC-SHA256 of the body with `GATEWAY_SECRET`)
//! - `Idempotency-Key: withdrawal-<id>`
//!
//! # Expected Response
//!
//! Any 2xx with a body of the form
//! `{"success": true, "transaction_id": "pout_123", "message": "queued"}`.
//! Non-2xx responses, timeouts, and undecodable bodies become [`GatewayError`]s.

use std::time::Duration;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use url::Url;

use super::{GatewayError, GatewayOutcome, PaymentGateway, PayoutInstruction};

type HmacSha256 = Hmac<Sha256>;

pub struct HttpGateway {
    client: reqwest::Client,
    endpoint: Url,
    secret: String,
    timeout: Duration,
}

impl HttpGateway {
    /// Build a gateway client.
    ///
    /// # Errors
    ///
    /// Returns a description of the problem when the base URL is invalid,
    /// uses plain HTTP for anything but localhost, or the client cannot be built.
    pub fn new(base_url: &str, secret: &str, timeout: Duration) -> Result<Self, String> {
        let base = validate_gateway_url(base_url)?;
        let endpoint = base
            .join("payouts")
            .map_err(|e| format!("Invalid gateway URL: {}", e))?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| format!("HTTP client error: {}", e))?;

        Ok(Self {
            client,
            endpoint,
            secret: secret.to_string(),
            timeout,
        })
    }
}

#[async_trait]
impl PaymentGateway for HttpGateway {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn send_payout(&self, instruction: &PayoutInstruction) -> Result<GatewayOutcome, GatewayError> {
        let body = serde_json::to_string(instruction)
            .map_err(|e| GatewayError::InvalidResponse(format!("Failed to serialize payout: {}", e)))?;
        let signature = generate_signature(&self.secret, &body);

        let response = self
            .client
            .post(self.endpoint.clone())
            .header("Content-Type", "application/json")
            .header("X-Payout-Signature", &signature)
            .header("Idempotency-Key", &instruction.reference)
            .body(body)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| self.classify(e))?;

        if !status.is_success() {
            return Err(GatewayError::Rejected {
                status: status.as_u16(),
                body: text,
            });
        }

        serde_json::from_str::<GatewayOutcome>(&text)
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))
    }
}

impl HttpGateway {
    fn classify(&self, error: reqwest::Error) -> GatewayError {
        if error.is_timeout() {
            GatewayError::Timeout(self.timeout)
        } else {
            GatewayError::Transport(error)
        }
    }
}

/// Generate HMAC-SHA256 signature for a request body.
///
/// # Format
///
/// `sha256=<hex_encoded_hmac>`
pub fn generate_signature(secret: &str, payload: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC key length is valid");
    mac.update(payload.as_bytes());
    let result = mac.finalize();
    format!("sha256={}", hex::encode(result.into_bytes()))
}

/// Validate the gateway base URL.
///
/// # Rules
///
/// - Must be valid URL
/// - Must be HTTPS (HTTP localhost allowed for development)
/// - Maximum 2048 characters
fn validate_gateway_url(url: &str) -> Result<Url, String> {
    if url.len() > 2048 {
        return Err("URL exceeds 2048 characters".to_string());
    }

    let mut parsed = Url::parse(url).map_err(|_| "Invalid URL format".to_string())?;

    match parsed.scheme() {
        "https" => {}
        "http" => {
            let local = matches!(
                parsed.host_str(),
                Some("localhost") | Some("127.0.0.1") | Some("0.0.0.0")
            );
            if !local {
                return Err("HTTP is only allowed for localhost. Use HTTPS for production.".to_string());
            }
        }
        _ => return Err("URL must use HTTP or HTTPS".to_string()),
    }

    // `join` replaces the last path segment unless the path ends with '/'
    if !parsed.path().ends_with('/') {
        let path = format!("{}/", parsed.path());
        parsed.set_path(&path);
    }

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::withdrawal::PayoutDestination;
    use axum::{
        Json, Router,
        http::{HeaderMap, StatusCode},
        routing::post,
    };
    use serde_json::json;

    const SECRET: &str = "gateway-secret";

    fn instruction() -> PayoutInstruction {
        PayoutInstruction {
            withdrawal_id: 42,
            gym_id: 7,
            gym_name: "Iron Temple".to_string(),
            amount_cents: 300_000,
            destination: PayoutDestination::Upi {
                vpa: "irontemple@okbank".to_string(),
            },
            reference: PayoutInstruction::reference_for(42),
        }
    }

    async fn spawn_stub(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn successful_payout_is_signed_and_decoded() {
        async fn handler(headers: HeaderMap, body: String) -> (StatusCode, Json<serde_json::Value>) {
            let signature = headers
                .get("X-Payout-Signature")
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default();
            let idempotency = headers
                .get("Idempotency-Key")
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default();

            if signature != generate_signature(SECRET, &body) || idempotency != "withdrawal-42" {
                return (StatusCode::UNAUTHORIZED, Json(json!({ "success": false })));
            }

            (
                StatusCode::OK,
                Json(json!({ "success": true, "transaction_id": "pout_001", "message": "queued" })),
            )
        }

        let base = spawn_stub(Router::new().route("/payouts", post(handler))).await;
        let gateway = HttpGateway::new(&base, SECRET, Duration::from_secs(5)).unwrap();

        let outcome = gateway.send_payout(&instruction()).await.unwrap();

        assert_eq!(
            outcome,
            GatewayOutcome {
                success: true,
                transaction_id: Some("pout_001".to_string()),
                message: Some("queued".to_string()),
            }
        );
    }

    #[tokio::test]
    async fn declared_failure_is_passed_through() {
        let router = Router::new().route(
            "/payouts",
            post(|| async { Json(json!({ "success": false, "message": "invalid IFSC" })) }),
        );
        let base = spawn_stub(router).await;
        let gateway = HttpGateway::new(&base, SECRET, Duration::from_secs(5)).unwrap();

        let outcome = gateway.send_payout(&instruction()).await.unwrap();

        assert!(!outcome.success);
        assert_eq!(outcome.transaction_id, None);
        assert_eq!(outcome.message.as_deref(), Some("invalid IFSC"));
    }

    #[tokio::test]
    async fn server_error_is_rejected() {
        let router = Router::new().route(
            "/payouts",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "upstream down") }),
        );
        let base = spawn_stub(router).await;
        let gateway = HttpGateway::new(&base, SECRET, Duration::from_secs(5)).unwrap();

        let err = gateway.send_payout(&instruction()).await.unwrap_err();

        assert!(matches!(err, GatewayError::Rejected { status: 500, ref body } if body == "upstream down"));
    }

    #[tokio::test]
    async fn slow_gateway_times_out() {
        let router = Router::new().route(
            "/payouts",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(3)).await;
                Json(json!({ "success": true, "transaction_id": "late" }))
            }),
        );
        let base = spawn_stub(router).await;
        let gateway = HttpGateway::new(&base, SECRET, Duration::from_millis(200)).unwrap();

        let err = gateway.send_payout(&instruction()).await.unwrap_err();

        assert!(matches!(err, GatewayError::Timeout(_)));
    }

    #[tokio::test]
    async fn garbage_body_is_invalid_response() {
        let router = Router::new().route("/payouts", post(|| async { "OK" }));
        let base = spawn_stub(router).await;
        let gateway = HttpGateway::new(&base, SECRET, Duration::from_secs(5)).unwrap();

        let err = gateway.send_payout(&instruction()).await.unwrap_err();

        assert!(matches!(err, GatewayError::InvalidResponse(_)));
    }

    #[test]
    fn base_path_is_kept_when_joining() {
        let gateway =
            HttpGateway::new("https://pay.example.com/v2", SECRET, Duration::from_secs(1)).unwrap();
        assert_eq!(gateway.endpoint.as_str(), "https://pay.example.com/v2/payouts");
    }

    #[test]
    fn plain_http_is_limited_to_localhost() {
        assert!(validate_gateway_url("http://localhost:8080").is_ok());
        assert!(validate_gateway_url("http://pay.example.com").is_err());
        assert!(validate_gateway_url("ftp://pay.example.com").is_err());
    }

    #[test]
    fn signature_is_stable() {
        let a = generate_signature("key", "{\"a\":1}");
        let b = generate_signature("key", "{\"a\":1}");
        let c = generate_signature("other", "{\"a\":1}");

        assert!(a.starts_with("sha256="));
        assert_eq!(a.len(), "sha256=".len() + 64);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
