pub mod health;

use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::analysis::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Analysis API
        .route("/api/v1/analysis", post(handlers::handle_request_analysis))
        .route(
            "/api/v1/analysis/status",
            get(handlers::handle_analysis_status),
        )
        // Admin
        .route("/api/v1/cache", delete(handlers::handle_flush_cache))
        .with_state(state)
}
