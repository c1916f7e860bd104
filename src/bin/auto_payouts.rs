//! Scheduled payout run.
//!
//! Intended for cron: processes every eligible withdrawal once, prints
//! `Processed: N, Failed: M, Total: T` to stdout and exits. Logs go to
//! stderr. Exits non-zero when the run was aborted.

use gym_payout_server::{config::Config, db, init_tracing, services::payout_service};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = Config::from_env()?;
    let pool = db::create_pool(&config.database_url, config.database_max_connections).await?;
    db::run_migrations(&pool).await?;

    let summary = payout_service::run_auto_payouts(&pool, &config).await?;
    println!("{summary}");

    pool.close().await;
    Ok(())
}
