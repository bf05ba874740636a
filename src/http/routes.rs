use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Session control
        .route("/conversation/toggle", post(handlers::toggle_conversation))
        .route("/conversation/start", post(handlers::start_conversation))
        .route("/conversation/stop", post(handlers::stop_conversation))
        .route("/conversation/message", post(handlers::send_message))
        .route("/conversation/mute", post(handlers::toggle_mute))
        .route("/conversation/speaker", post(handlers::toggle_speaker))
        .route("/conversation/status", get(handlers::get_conversation_status))
        // Archival
        .route("/archive/status", get(handlers::get_archive_status))
        .route("/archive/retry", post(handlers::retry_archive))
        // Add tracing middleware for request logging
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}
