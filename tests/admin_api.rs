mod helpers;

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use gym_payout_server::{
    config::Config,
    middleware::auth::hash_api_key,
    routes::{AppState, build_router},
};
use helpers::*;
use serde_json::{Value, json};
use tower::ServiceExt;

const API_KEY: &str = "test-admin-key";

async fn app(db: &TestDatabase) -> Router {
    sqlx::query("INSERT INTO admin_api_keys (key_hash, admin_name) VALUES ($1, 'finance')")
        .bind(hash_api_key(API_KEY))
        .execute(&db.pool)
        .await
        .unwrap();

    let config = Config {
        database_url: String::new(),
        server_port: 3000,
        database_max_connections: 5,
        gateway_base_url: None,
        gateway_secret: None,
        gateway_timeout_secs: 30,
    };

    build_router(AppState {
        pool: db.pool.clone(),
        config: Arc::new(config),
    })
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("Authorization", format!("Bearer {API_KEY}"))
        .header("Content-Type", "application/json");
    let request = match body {
        Some(body) => request.body(Body::from(body.to_string())).unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

#[tokio::test]
async fn settings_round_trip_through_the_api() {
    let Some(db) = TestDatabase::new().await else { return };
    let app = app(&db).await;

    let (status, body) = send(&app, "GET", "/api/v1/settings/payouts", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["enabled"], false);
    assert_eq!(body["max_amount"], "50000.00");

    let (status, body) = send(
        &app,
        "PUT",
        "/api/v1/settings/payouts",
        Some(json!({ "enabled": true, "min_hours": 48, "max_amount": "2500.50", "gateway": "manual" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["min_hours"], 48);
    assert_eq!(body["max_amount"], "2500.50");

    let actor: String =
        sqlx::query_scalar("SELECT actor FROM activity_logs WHERE action = 'payout_settings_updated'")
            .fetch_one(&db.pool)
            .await
            .unwrap();
    assert_eq!(actor, "admin:finance");

    let (status, body) = send(
        &app,
        "PUT",
        "/api/v1/settings/payouts",
        Some(json!({ "enabled": true, "min_hours": -1, "max_amount": "10", "gateway": "manual" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "invalid_settings");

    db.cleanup().await;
}

#[tokio::test]
async fn withdrawal_can_be_failed_once() {
    let Some(db) = TestDatabase::new().await else { return };
    let app = app(&db).await;

    let gym = db.create_gym("Iron Temple", 0).await;
    let withdrawal = db.create_withdrawal(gym, 40_000, 2).await;

    let uri = format!("/api/v1/withdrawals/{withdrawal}/fail");
    let (status, body) = send(&app, "POST", &uri, Some(json!({ "reason": "Bank account closed" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "failed");

    let (status, body) = send(&app, "POST", &uri, Some(json!({ "reason": "again" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "withdrawal_already_processed");

    let (status, body) = send(&app, "GET", &format!("/api/v1/gyms/{gym}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["balance_cents"], 40_000);
    assert_eq!(body["bank_account_last4"], "4455");

    let (status, body) = send(&app, "GET", &format!("/api/v1/gyms/{gym}/notifications"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["title"], "Payout Processing Failed");

    db.cleanup().await;
}

#[tokio::test]
async fn unknown_resources_are_not_found() {
    let Some(db) = TestDatabase::new().await else { return };
    let app = app(&db).await;

    let (status, body) = send(&app, "GET", "/api/v1/withdrawals/424242", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "withdrawal_not_found");

    let (status, _) = send(&app, "GET", "/api/v1/gyms/424242", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "DELETE", "/api/v1/cutoff-rules/424242", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    db.cleanup().await;
}

#[tokio::test]
async fn inactive_key_is_rejected() {
    let Some(db) = TestDatabase::new().await else { return };
    let app = app(&db).await;

    sqlx::query("UPDATE admin_api_keys SET is_active = false")
        .execute(&db.pool)
        .await
        .unwrap();

    let (status, _) = send(&app, "GET", "/api/v1/activity-logs", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    db.cleanup().await;
}
