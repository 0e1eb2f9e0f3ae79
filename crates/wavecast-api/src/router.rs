//! Route definitions for the Wavecast HTTP API.
//!
//! All routes are organized by domain and mounted under `/api`. The router
//! receives `AppState` and passes it to all handlers via Axum's `State`
//! extractor.

use axum::http::HeaderValue;
use axum::{
    Router,
    routing::{get, post},
};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Build the complete Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .merge(console_routes())
        .merge(health_routes());

    let cors = build_cors_layer(&state);

    Router::new()
        .nest("/api", api_routes)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Console lock operations and admin history.
fn console_routes() -> Router<AppState> {
    Router::new()
        .route("/console/lock", get(handlers::console::lock_status))
        .route("/console/lock/claim", post(handlers::console::claim_lock))
        .route(
            "/console/lock/release",
            post(handlers::console::release_lock),
        )
        .route(
            "/console/lock/heartbeat",
            post(handlers::console::lock_heartbeat),
        )
        .route(
            "/console/lock/kick-notice",
            post(handlers::console::lock_kick_notice),
        )
        .route("/console/sessions", get(handlers::console::session_history))
}

/// Liveness probe.
fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health::health))
}

/// CORS from configuration; same-origin only when no origins are listed.
fn build_cors_layer(state: &AppState) -> CorsLayer {
    let origins = &state.config.server.cors_allowed_origins;
    if origins.is_empty() {
        return CorsLayer::new();
    }

    let parsed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();

    CorsLayer::new()
        .allow_origin(parsed)
        .allow_methods(Any)
        .allow_headers(Any)
}
