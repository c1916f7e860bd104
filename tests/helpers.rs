#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use gym_payout_server::{
    db::{DbPool, run_migrations},
    gateway::{GatewayError, GatewayOutcome, PaymentGateway, PayoutInstruction},
};
use sqlx::postgres::PgPoolOptions;
use tokio::sync::Mutex;
use uuid::Uuid;

/// A migrated database isolated in its own schema.
///
/// Returns `None` when `TEST_DATABASE_URL` is not set so database tests can
/// be skipped on machines without PostgreSQL.
pub struct TestDatabase {
    pub pool: DbPool,
    pub schema: String,
}

impl TestDatabase {
    pub async fn new() -> Option<Self> {
        let Ok(database_url) = std::env::var("TEST_DATABASE_URL") else {
            eprintln!("TEST_DATABASE_URL not set, skipping database test");
            return None;
        };

        let schema = format!("test_{}", Uuid::new_v4().simple());

        let admin = PgPoolOptions::new()
            .max_connections(1)
            .connect(&database_url)
            .await
            .expect("Failed to connect to test database");
        sqlx::query(&format!("CREATE SCHEMA {schema}"))
            .execute(&admin)
            .await
            .expect("Failed to create test schema");
        admin.close().await;

        let search_path = schema.clone();
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .after_connect(move |conn, _meta| {
                let statement = format!("SET search_path TO {search_path}");
                Box::pin(async move {
                    sqlx::query(&statement).execute(conn).await?;
                    Ok(())
                })
            })
            .connect(&database_url)
            .await
            .expect("Failed to create test database pool");

        run_migrations(&pool).await.expect("Failed to run migrations");

        Some(Self { pool, schema })
    }

    pub async fn set_setting(&self, key: &str, value: &str) {
        sqlx::query("UPDATE system_settings SET setting_value = $2 WHERE setting_key = $1")
            .bind(key)
            .bind(value)
            .execute(&self.pool)
            .await
            .expect("Failed to update setting");
    }

    /// Enable auto payouts with the given window and the manual gateway.
    pub async fn enable_payouts(&self, min_hours: i64, max_amount: &str) {
        self.set_setting("auto_payout_enabled", "1").await;
        self.set_setting("auto_payout_min_hours", &min_hours.to_string()).await;
        self.set_setting("auto_payout_max_amount", max_amount).await;
        self.set_setting("payment_gateway", "manual").await;
    }

    /// Insert a gym with UPI and bank details on file.
    pub async fn create_gym(&self, name: &str, balance_cents: i64) -> i64 {
        sqlx::query_scalar(
            r#"
            INSERT INTO gyms (name, balance_cents, bank_account_name, bank_account_number, bank_ifsc, upi_id)
            VALUES ($1, $2, $1, '001122334455', 'HDFC0000123', 'gym@upi')
            RETURNING id
            "#,
        )
        .bind(name)
        .bind(balance_cents)
        .fetch_one(&self.pool)
        .await
        .expect("Failed to create gym")
    }

    /// Insert a pending bank-transfer withdrawal created `age_hours` ago.
    pub async fn create_withdrawal(&self, gym_id: i64, amount_cents: i64, age_hours: i64) -> i64 {
        sqlx::query_scalar(
            r#"
            INSERT INTO withdrawals (gym_id, amount_cents, payment_method, created_at)
            VALUES ($1, $2, 'bank_transfer', NOW() - make_interval(hours => $3::int))
            RETURNING id
            "#,
        )
        .bind(gym_id)
        .bind(amount_cents)
        .bind(age_hours as i32)
        .fetch_one(&self.pool)
        .await
        .expect("Failed to create withdrawal")
    }

    pub async fn balance(&self, gym_id: i64) -> i64 {
        sqlx::query_scalar("SELECT balance_cents FROM gyms WHERE id = $1")
            .bind(gym_id)
            .fetch_one(&self.pool)
            .await
            .expect("Failed to read balance")
    }

    pub async fn withdrawal_row(&self, withdrawal_id: i64) -> (String, Option<String>, Option<String>) {
        sqlx::query_as("SELECT status, transaction_id, notes FROM withdrawals WHERE id = $1")
            .bind(withdrawal_id)
            .fetch_one(&self.pool)
            .await
            .expect("Failed to read withdrawal")
    }

    pub async fn notification_titles(&self, gym_id: i64) -> Vec<String> {
        sqlx::query_scalar("SELECT title FROM gym_notifications WHERE gym_id = $1 ORDER BY id")
            .bind(gym_id)
            .fetch_all(&self.pool)
            .await
            .expect("Failed to read notifications")
    }

    /// Run one raw statement (DDL, triggers) in the test schema.
    pub async fn execute(&self, statement: &str) {
        sqlx::query(statement)
            .execute(&self.pool)
            .await
            .expect("Failed to execute statement");
    }

    /// Make every insert into `table` matching `condition` raise `message`.
    ///
    /// With `deferred`, the check runs at commit instead of at insert time.
    pub async fn reject_inserts(&self, table: &str, condition: &str, message: &str, deferred: bool) {
        let function = format!("reject_{table}_insert");
        self.execute(&format!(
            r#"
            CREATE FUNCTION {function}() RETURNS trigger AS $$
            BEGIN
                IF {condition} THEN
                    RAISE EXCEPTION '{message}';
                END IF;
                RETURN NEW;
            END
            $$ LANGUAGE plpgsql
            "#
        ))
        .await;

        let trigger = if deferred {
            format!(
                "CREATE CONSTRAINT TRIGGER {function} AFTER INSERT ON {table} \
                 DEFERRABLE INITIALLY DEFERRED FOR EACH ROW EXECUTE FUNCTION {function}()"
            )
        } else {
            format!("CREATE TRIGGER {function} BEFORE INSERT ON {table} FOR EACH ROW EXECUTE FUNCTION {function}()")
        };
        self.execute(&trigger).await;
    }

    pub async fn activity_details(&self, action: &str) -> Vec<serde_json::Value> {
        sqlx::query_scalar("SELECT details FROM activity_logs WHERE action = $1 ORDER BY id")
            .bind(action)
            .fetch_all(&self.pool)
            .await
            .expect("Failed to read activity entries")
    }

    pub async fn notification_messages(&self, gym_id: i64) -> Vec<String> {
        sqlx::query_scalar("SELECT message FROM gym_notifications WHERE gym_id = $1 ORDER BY id")
            .bind(gym_id)
            .fetch_all(&self.pool)
            .await
            .expect("Failed to read notifications")
    }

    pub async fn count_actions(&self, action: &str) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM activity_logs WHERE action = $1")
            .bind(action)
            .fetch_one(&self.pool)
            .await
            .expect("Failed to count activity entries")
    }

    /// Drop the schema created for this test.
    pub async fn cleanup(self) {
        sqlx::query(&format!("DROP SCHEMA {} CASCADE", self.schema))
            .execute(&self.pool)
            .await
            .expect("Failed to drop test schema");
        self.pool.close().await;
    }
}

/// Scripted gateway behaviour.
#[derive(Debug, Clone, Copy)]
pub enum Script {
    Succeed,
    Decline,
    Hang,
}

/// Gateway double that records every instruction it receives.
pub struct StubGateway {
    script: Script,
    pub calls: Arc<Mutex<Vec<i64>>>,
}

impl StubGateway {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl PaymentGateway for StubGateway {
    fn name(&self) -> &'static str {
        "stub"
    }

    async fn send_payout(&self, instruction: &PayoutInstruction) -> Result<GatewayOutcome, GatewayError> {
        self.calls.lock().await.push(instruction.withdrawal_id);

        match self.script {
            Script::Succeed => Ok(GatewayOutcome {
                success: true,
                transaction_id: Some(format!("stub-{}", instruction.withdrawal_id)),
                message: None,
            }),
            Script::Decline => Ok(GatewayOutcome {
                success: false,
                transaction_id: None,
                message: Some("insufficient float".to_string()),
            }),
            Script::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                unreachable!("the payout run times the gateway out first")
            }
        }
    }
}
