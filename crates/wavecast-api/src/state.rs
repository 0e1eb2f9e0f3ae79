//! Application state shared across all handlers and middleware.

use std::sync::Arc;

use sqlx::PgPool;

use wavecast_auth::jwt::JwtDecoder;
use wavecast_console::coordinator::ConsoleCoordinator;
use wavecast_core::config::AppConfig;

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`. All fields are
/// `Arc`-wrapped for cheap cloning across tasks.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// PostgreSQL connection pool.
    pub db_pool: PgPool,
    /// Bearer-token decoder.
    pub jwt_decoder: Arc<JwtDecoder>,
    /// The console lock coordinator.
    pub coordinator: Arc<ConsoleCoordinator>,
}
