//! Admin API key authentication middleware.
//!
//! This middleware intercepts every `/api/v1` request to:
//! 1. Extract the API key from the Authorization header
//! 2. Hash it and verify it against `admin_api_keys`
//! 3. Inject authentication context into the request
//! 4. Reject unauthorized requests with HTTP 401

use crate::{db::DbPool, error::AppError, models::api_key::AdminApiKey};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Authentication context attached to authenticated requests.
///
/// Handlers extract it with `Extension<AuthContext>` to attribute audit
/// entries to the administrator who made the request.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// ID of the authenticated API key
    pub api_key_id: Uuid,

    /// Administrator the key was issued to
    pub admin_name: String,
}

impl AuthContext {
    /// Actor string written to the activity log.
    pub fn actor(&self) -> String {
        format!("admin:{}", self.admin_name)
    }
}

/// Hex-encoded SHA-256 of a raw API key, as stored in `admin_api_keys.key_hash`.
pub fn hash_api_key(api_key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(api_key.as_bytes());
    hex::encode(hasher.finalize())
}

/// API key authentication middleware function.
///
/// # Flow
///
/// 1. Extract `Authorization: Bearer <key>` header from request
/// 2. Hash the `<key>` using SHA-256
/// 3. Query database for matching hash where `is_active = true`
/// 4. If found: inject `AuthContext` into request, call next handler
/// 5. If not found: return 401 Unauthorized error
///
/// Malformed headers are rejected before any database access.
pub async fn auth_middleware(
    State(pool): State<DbPool>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let api_key = request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .ok_or(AppError::InvalidApiKey)?;

    let key_hash = hash_api_key(api_key);

    let admin_key = sqlx::query_as::<_, AdminApiKey>(
        "SELECT id, key_hash, admin_name, created_at, is_active
         FROM admin_api_keys
         WHERE key_hash = $1 AND is_active = true",
    )
    .bind(&key_hash)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::InvalidApiKey)?;

    request.extensions_mut().insert(AuthContext {
        api_key_id: admin_key.id,
        admin_name: admin_key.admin_name,
    });

    Ok(next.run(request).await)
}
