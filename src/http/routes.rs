use super::handlers;
use super::live_ws;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Tariff lookups
        .route("/tariffs/search", post(handlers::search_tariffs))
        .route("/tariffs/suggest", get(handlers::suggest_tariffs))
        .route("/tariffs/export", get(handlers::export_tariffs))
        // Status checks
        .route("/bivac/:report_id", get(handlers::check_bivac))
        .route("/vehicles/:chassis_number", get(handlers::vehicle_report))
        // Streamed chat
        .route("/chat", post(handlers::chat))
        // Live voice bridge and session queries
        .route("/live/ws", get(live_ws::live_socket))
        .route("/live/:session_id/status", get(handlers::live_status))
        .route(
            "/live/:session_id/transcript",
            get(handlers::live_transcript),
        )
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        // The browser client is served from a different origin
        .layer(CorsLayer::permissive())
        .with_state(state)
}
