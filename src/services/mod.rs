//! Business logic services.
//!
//! Services contain core business logic separated from HTTP handlers and
//! binaries. They own database transactions, validation and audit writes.

pub mod activity_log;
pub mod notification_service;
pub mod payout_service;
pub mod revenue_service;
pub mod settings_service;
