//! API Routes
//!
//! Configures the Axum router with all inspection server endpoints.

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    blockades_handler, clear_handler, conversations_handler, health_handler, hospital_handler,
    hospitals_handler, incidents_handler, invalidate_handler, preload_handler,
    route_preload_handler, stats_handler, status_handler, transfer_handler, transfers_handler,
    AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Middleware
/// - CORS: Allows any origin
/// - Tracing: Logs all requests
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        // Cache inspection
        .route("/cache", delete(clear_handler))
        .route("/cache/stats", get(stats_handler))
        .route("/cache/status/:key", get(status_handler))
        .route("/cache/keys/:pattern", delete(invalidate_handler))
        // Preloading
        .route("/preload", post(preload_handler))
        .route("/preload/route", post(route_preload_handler))
        // Read-through resources
        .route("/hospitals", get(hospitals_handler))
        .route("/hospitals/:id", get(hospital_handler))
        .route("/blockades", get(blockades_handler))
        .route("/transfers", get(transfers_handler))
        .route("/transfers/:id", get(transfer_handler))
        .route("/chat/conversations", get(conversations_handler))
        .route("/incidents", get(incidents_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
