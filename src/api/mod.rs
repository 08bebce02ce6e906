pub mod admin;
pub mod health;
pub mod jobs;

use crate::datasource::DepositSource;
use crate::orchestration::RewardEngine;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<RewardEngine>,
    /// Feed used by the on-demand deposit scan; `None` disables the route.
    pub deposit_source: Option<Arc<dyn DepositSource>>,
}

impl AppState {
    pub fn new(engine: Arc<RewardEngine>, deposit_source: Option<Arc<dyn DepositSource>>) -> Self {
        Self {
            engine,
            deposit_source,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/v1/admin/users", post(admin::register_user))
        .route("/v1/admin/users/:id/area-level", post(admin::set_area_level))
        .route("/v1/admin/users/:id/vip", post(admin::set_vip))
        .route("/v1/admin/placements", post(admin::create_placement))
        .route("/v1/admin/jobs/deposit-scan", post(jobs::deposit_scan))
        .route(
            "/v1/admin/jobs/daily-position-reward",
            post(jobs::daily_position_reward),
        )
        .route("/v1/admin/jobs/area-reward", post(jobs::area_reward))
        .route("/v1/admin/jobs/area-rebuild", post(jobs::area_rebuild))
        .layer(cors)
        .with_state(state)
}
