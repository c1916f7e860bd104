//! HTTP router and shared application state.

use std::sync::Arc;

use axum::{
    Router,
    extract::FromRef,
    middleware as axum_middleware,
    routing::{delete, get, post},
};
use tower_http::trace::TraceLayer;

use crate::{config::Config, db::DbPool, handlers, middleware};

/// State shared with every handler.
///
/// Handlers extract only what they need (`State<DbPool>` or
/// `State<Arc<Config>>`).
#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub config: Arc<Config>,
}

impl FromRef<AppState> for DbPool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Arc<Config> {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

/// Build the admin API router.
///
/// `/health` is public; every `/api/v1` route goes through the API key
/// middleware.
pub fn build_router(state: AppState) -> Router {
    let authenticated_routes = Router::new()
        // Payout settings
        .route(
            "/api/v1/settings/payouts",
            get(handlers::settings::get_payout_settings).put(handlers::settings::update_payout_settings),
        )
        // Payout runs and withdrawals
        .route("/api/v1/payouts/run", post(handlers::payouts::run_payouts))
        .route("/api/v1/withdrawals", get(handlers::withdrawals::list_withdrawals))
        .route(
            "/api/v1/withdrawals/{id}",
            get(handlers::withdrawals::get_withdrawal),
        )
        .route(
            "/api/v1/withdrawals/{id}/complete",
            post(handlers::withdrawals::complete_withdrawal),
        )
        .route(
            "/api/v1/withdrawals/{id}/fail",
            post(handlers::withdrawals::fail_withdrawal),
        )
        // Gyms
        .route("/api/v1/gyms/{id}", get(handlers::gyms::get_gym))
        .route(
            "/api/v1/gyms/{id}/notifications",
            get(handlers::gyms::list_notifications),
        )
        // Audit trail
        .route(
            "/api/v1/activity-logs",
            get(handlers::activity::list_activity_logs),
        )
        // Cut-off chart and revenue
        .route(
            "/api/v1/cutoff-rules",
            get(handlers::cutoffs::list_rules).post(handlers::cutoffs::create_rule),
        )
        .route(
            "/api/v1/cutoff-rules/{id}",
            delete(handlers::cutoffs::delete_rule),
        )
        .route(
            "/api/v1/revenue/distribute",
            post(handlers::revenue::distribute_revenue),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.pool.clone(),
            middleware::auth::auth_middleware,
        ));

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .merge(authenticated_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
