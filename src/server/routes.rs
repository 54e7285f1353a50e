use axum::routing::{get, post};
use axum::Router;

use super::handlers::{self, AppState};

/// Create the API router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/analyze", post(handlers::analyze))
        .route("/audit", post(handlers::audit))
        .with_state(state)
}
