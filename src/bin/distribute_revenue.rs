//! Scheduled revenue distribution.
//!
//! Prints `Distributed: N, Skipped: S, Total: T` to stdout and exits.

use gym_payout_server::{config::Config, db, init_tracing, services::revenue_service};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = Config::from_env()?;
    let pool = db::create_pool(&config.database_url, config.database_max_connections).await?;
    db::run_migrations(&pool).await?;

    let summary = revenue_service::distribute_revenue(&pool).await?;
    println!("{summary}");

    pool.close().await;
    Ok(())
}
