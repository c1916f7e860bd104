//! Gym payout back office.
//!
//! Pays out gym withdrawal requests through a payment gateway, splits visit
//! revenue through the cut-off chart, and exposes both to administrators
//! over a small JSON API. The `auto_payouts` and `distribute_revenue`
//! binaries run a single batch and exit; `gym_payout_server` serves the API.

pub mod config;
pub mod db;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
///
/// Reads `RUST_LOG` (defaults to "info"). Logs go to stderr so the batch
/// binaries keep stdout for their summary line.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();
}
