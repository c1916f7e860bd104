//! HTTP request handlers (route handlers).
//!
//! Each handler is an async function that:
//! 1. Receives HTTP request data (JSON body, URL params, etc.)
//! 2. Delegates to a service
//! 3. Returns HTTP response (JSON, status code)

/// Activity log endpoint
pub mod activity;
/// Cut-off chart endpoints
pub mod cutoffs;
/// Gym and notification endpoints
pub mod gyms;
/// Health check endpoint
pub mod health;
/// Payout run endpoint
pub mod payouts;
/// Visit revenue distribution endpoint
pub mod revenue;
/// Payout settings endpoints
pub mod settings;
/// Withdrawal endpoints
pub mod withdrawals;
