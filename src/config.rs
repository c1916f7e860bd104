//! Application configuration management.
//!
//! This module handles loading configuration from environment variables.
//! It uses the `envy` crate to automatically deserialize environment variables into a type-safe struct.

use std::time::Duration;

use serde::Deserialize;

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `DATABASE_URL` (required): PostgreSQL connection string
/// - `SERVER_PORT` (optional): HTTP server port, defaults to 3000
/// - `DATABASE_MAX_CONNECTIONS` (optional): pool size, defaults to 5
/// - `GATEWAY_BASE_URL` (optional): base URL of the HTTP payment gateway
/// - `GATEWAY_SECRET` (optional): shared secret used to sign gateway requests
/// - `GATEWAY_TIMEOUT_SECS` (optional): per-payout gateway timeout, defaults to 30, must be > 0
///
/// Payout thresholds are NOT configured here. They live in the
/// `system_settings` table and are loaded at the start of every run
/// (see [`crate::models::settings::PayoutSettings`]).
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,

    #[serde(default = "default_port")]
    pub server_port: u16,

    #[serde(default = "default_max_connections")]
    pub database_max_connections: u32,

    #[serde(default)]
    pub gateway_base_url: Option<String>,

    #[serde(default)]
    pub gateway_secret: Option<String>,

    #[serde(
        default = "default_gateway_timeout_secs",
        deserialize_with = "deserialize_timeout_secs"
    )]
    pub gateway_timeout_secs: u64,
}

/// Default port if SERVER_PORT environment variable is not set.
fn default_port() -> u16 {
    3000
}

fn default_max_connections() -> u32 {
    5
}

fn default_gateway_timeout_secs() -> u64 {
    30
}

/// A zero timeout would fail (and refund) every payout of every run.
fn deserialize_timeout_secs<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let secs = u64::deserialize(deserializer)?;
    if secs == 0 {
        return Err(serde::de::Error::custom(
            "GATEWAY_TIMEOUT_SECS must be at least 1",
        ));
    }
    Ok(secs)
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// This method first attempts to load a `.env` file (which is optional),
    /// then reads environment variables and deserializes them into a Config struct.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing (e.g., DATABASE_URL)
    /// - Environment variable values cannot be parsed into expected types
    pub fn from_env() -> Result<Self, envy::Error> {
        // Try to load .env file if it exists (does nothing if not found)
        dotenvy::dotenv().ok();

        // Field names are automatically converted: database_url -> DATABASE_URL
        envy::from_env::<Config>()
    }

    /// Upper bound for a single gateway call.
    pub fn gateway_timeout(&self) -> Duration {
        Duration::from_secs(self.gateway_timeout_secs)
    }
}
