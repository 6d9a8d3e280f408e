mod auth;
mod directions;
mod health;
mod metrics;
mod places;
mod usage;

use axum::Router;
use axum::routing::{get, post};
use std::sync::Arc;

use crate::state::AppState;

pub use auth::login_handler;
pub use directions::directions_handler;
pub use health::health_handler;
pub use metrics::metrics_handler;
pub use places::{
    clear_recent_handler, nearby_handler, popular_handler, recent_handler, search_handler,
};
pub use usage::usage_handler;

// creating the router with routes
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/api/auth/login", post(login_handler))
        .route("/api/places", get(search_handler))
        .route("/api/places/popular", get(popular_handler))
        .route("/api/places/recent-searches", get(recent_handler).delete(clear_recent_handler))
        .route("/api/places/kakao/nearby", get(nearby_handler))
        .route("/api/directions", post(directions_handler))
        .route("/api/admin/api-usage", get(usage_handler))
        .with_state(state)
}
