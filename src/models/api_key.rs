//! Admin API key model for authentication.
//!
//! API keys are stored in the database as SHA-256 hashes.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Represents an admin API key record from the database.
///
/// # Database Table
///
/// Maps to the `admin_api_keys` table with columns:
/// - `id`: Unique identifier (UUID)
/// - `key_hash`: SHA-256 hash of the actual API key
/// - `admin_name`: Administrator the key was issued to
/// - `created_at`: When the key was created
/// - `is_active`: Whether the key is currently valid
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AdminApiKey {
    pub id: Uuid,

    /// SHA-256 hash of the actual API key (64 hex characters)
    pub key_hash: String,

    /// Recorded as the actor of every audit entry made with this key
    pub admin_name: String,

    pub created_at: DateTime<Utc>,

    /// Inactive keys are rejected during authentication.
    pub is_active: bool,
}
