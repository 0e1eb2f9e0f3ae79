//! Wavecast Server — internet radio station management
//!
//! Main entry point that wires all crates together and starts the server.

use std::sync::Arc;

use tracing_subscriber::{EnvFilter, fmt};

use wavecast_api::state::AppState;
use wavecast_auth::DbPermissionOracle;
use wavecast_auth::jwt::JwtDecoder;
use wavecast_console::coordinator::ConsoleCoordinator;
use wavecast_console::store::ConsoleLockStore;
use wavecast_core::config::AppConfig;
use wavecast_core::error::AppError;
use wavecast_core::traits::PermissionOracle;
use wavecast_database::repositories::{ConsoleSessionRepository, UserRepository};
use wavecast_database::{connection, migration};
use wavecast_worker::CronScheduler;

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

/// Load configuration from file, environment overlay, and env vars.
fn load_configuration() -> Result<AppConfig, AppError> {
    let config_path =
        std::env::var("WAVECAST_CONFIG").unwrap_or_else(|_| "config/default".to_string());
    let env = std::env::var("WAVECAST_ENV").unwrap_or_else(|_| "development".to_string());
    let overlay = format!("config/{env}");

    AppConfig::load(&config_path, Some(&overlay))
}

/// Initialize tracing/logging.
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => fmt().with_env_filter(filter).json().init(),
        _ => fmt().with_env_filter(filter).init(),
    }
}

async fn run(config: AppConfig) -> Result<(), AppError> {
    let config = Arc::new(config);

    let pool = connection::connect(&config.database).await?;
    migration::run_migrations(&pool).await?;

    let user_repo = Arc::new(UserRepository::new(pool.clone()));
    let session_repo = Arc::new(ConsoleSessionRepository::new(pool.clone()));

    let oracle: Arc<dyn PermissionOracle> = Arc::new(DbPermissionOracle::new(user_repo));
    let store: Arc<dyn ConsoleLockStore> = session_repo;
    let coordinator = Arc::new(ConsoleCoordinator::new(
        store,
        oracle,
        config.console.clone(),
    ));

    let state = AppState {
        config: config.clone(),
        db_pool: pool,
        jwt_decoder: Arc::new(JwtDecoder::new(&config.auth)),
        coordinator: coordinator.clone(),
    };

    let mut scheduler = None;
    if config.worker.enabled {
        let worker = CronScheduler::new(coordinator, config.worker.clone()).await?;
        worker.register_default_tasks().await?;
        worker.start().await?;
        scheduler = Some(worker);
    }

    let router = wavecast_api::build_router(state);
    let addr = config.server.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;

    tracing::info!(addr = %addr, "Wavecast server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::internal(format!("Server error: {e}")))?;

    if let Some(mut worker) = scheduler {
        let _ = worker.shutdown().await;
    }

    Ok(())
}

/// Resolves when the process receives a termination signal.
async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("Shutdown signal received");
}
