//! Cron scheduler for periodic maintenance tasks.

use std::sync::Arc;

use tokio_cron_scheduler::{Job as CronJob, JobScheduler};

use wavecast_console::coordinator::ConsoleCoordinator;
use wavecast_core::config::worker::WorkerConfig;
use wavecast_core::error::AppError;

/// Cron-based scheduler for periodic background tasks.
pub struct CronScheduler {
    /// The underlying job scheduler.
    scheduler: JobScheduler,
    /// Coordinator whose sweep the tasks drive.
    coordinator: Arc<ConsoleCoordinator>,
    /// Worker configuration.
    config: WorkerConfig,
}

impl std::fmt::Debug for CronScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CronScheduler").finish()
    }
}

impl CronScheduler {
    /// Create a new cron scheduler.
    pub async fn new(
        coordinator: Arc<ConsoleCoordinator>,
        config: WorkerConfig,
    ) -> Result<Self, AppError> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::internal(format!("Failed to create scheduler: {}", e)))?;

        Ok(Self {
            scheduler,
            coordinator,
            config,
        })
    }

    /// Register all default scheduled tasks.
    pub async fn register_default_tasks(&self) -> Result<(), AppError> {
        self.register_console_sweep().await?;

        tracing::info!("All scheduled tasks registered");
        Ok(())
    }

    /// Start the scheduler.
    pub async fn start(&self) -> Result<(), AppError> {
        self.scheduler
            .start()
            .await
            .map_err(|e| AppError::internal(format!("Failed to start scheduler: {}", e)))?;

        tracing::info!("Cron scheduler started");
        Ok(())
    }

    /// Shutdown the scheduler.
    pub async fn shutdown(&mut self) -> Result<(), AppError> {
        self.scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::internal(format!("Failed to shutdown scheduler: {}", e)))?;

        tracing::info!("Cron scheduler shut down");
        Ok(())
    }

    /// Console lock expiry sweep — every minute by default.
    ///
    /// The coordinator also sweeps on every `status` call; this job is the
    /// backstop for the window where nobody polls, so an abandoned lock
    /// never outlives the threshold by more than one schedule interval.
    async fn register_console_sweep(&self) -> Result<(), AppError> {
        let coordinator = Arc::clone(&self.coordinator);
        let schedule = self.config.sweep_schedule.clone();

        let job = CronJob::new_async(schedule.as_str(), move |_uuid, _lock| {
            let coordinator = Arc::clone(&coordinator);
            Box::pin(async move {
                match coordinator.sweep_expired().await {
                    Ok(swept) if swept > 0 => {
                        tracing::info!(swept, "Console sweep reclaimed stale locks");
                    }
                    Ok(_) => tracing::trace!("Console sweep found nothing stale"),
                    Err(e) => tracing::error!("Console sweep failed: {}", e),
                }
            })
        })
        .map_err(|e| {
            AppError::internal(format!("Failed to create console_sweep schedule: {}", e))
        })?;

        self.scheduler.add(job).await.map_err(|e| {
            AppError::internal(format!("Failed to add console_sweep schedule: {}", e))
        })?;

        tracing::info!(schedule = %schedule, "Registered: console_sweep");
        Ok(())
    }
}
