//! Gym Payout Server - Admin API Entry Point
//!
//! REST API for the finance team: payout settings, manual withdrawal
//! processing, on-demand payout and revenue runs, gym balances and the
//! audit trail.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Database**: PostgreSQL with sqlx (async queries)
//! - **Authentication**: admin API key with SHA-256 hashing
//! - **Format**: JSON requests/responses
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Create database connection pool
//! 3. Run database migrations
//! 4. Build HTTP router with routes and middleware
//! 5. Start server on configured port

use std::sync::Arc;

use gym_payout_server::{
    config::Config,
    db, init_tracing,
    routes::{self, AppState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = Config::from_env()?;
    tracing::info!("Configuration loaded");

    let pool = db::create_pool(&config.database_url, config.database_max_connections).await?;
    tracing::info!("Database pool created");

    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations complete");

    let addr = format!("0.0.0.0:{}", config.server_port);

    let app = routes::build_router(AppState {
        pool,
        config: Arc::new(config),
    });

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
