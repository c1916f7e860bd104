//! Data models representing database entities.
//!
//! This module contains all data structures that map to database tables,
//! plus the request/response types built from them.

/// Audit trail entries
pub mod activity_log;
/// Admin API key authentication model
pub mod api_key;
/// Gyms, balances and notifications
pub mod gym;
/// Payout run outcomes and summaries
pub mod payout;
/// Cut-off chart and visit revenue
pub mod revenue;
/// Payout settings loaded from `system_settings`
pub mod settings;
/// Withdrawal requests and their lifecycle
pub mod withdrawal;
