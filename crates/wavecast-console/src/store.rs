//! Persistence seam for the lock coordinator.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use wavecast_core::result::AppResult;
use wavecast_database::repositories::ConsoleSessionRepository;
use wavecast_entity::console::ConsoleSession;

use crate::dto::KickedBy;

/// Storage operations the coordinator needs from the session table.
///
/// Implementations must make `claim` atomic and uphold the single-active-row
/// invariant; everything else is plain row CRUD. Two implementations exist:
/// the Postgres repository (partial unique index + transaction) and
/// [`crate::memory::MemoryLockStore`] (one mutex) for single-node use and
/// tests.
#[async_trait]
pub trait ConsoleLockStore: Send + Sync + 'static {
    /// The currently active row, if any.
    async fn find_active(&self) -> AppResult<Option<ConsoleSession>>;

    /// Deactivate active rows with `last_activity` older than `cutoff`.
    /// No kick stamp: a timeout is not an eviction. Returns how many rows
    /// were swept.
    async fn deactivate_stale(&self, cutoff: DateTime<Utc>) -> AppResult<u64>;

    /// Atomically displace any other holder (stamping them with the
    /// claimer's identity), deactivate the claimer's own rows (unstamped),
    /// and insert a fresh active row. A lost race yields a Conflict.
    async fn claim(&self, user_id: Uuid, user_name: &str) -> AppResult<ConsoleSession>;

    /// Deactivate the caller's own active rows. Returns how many rows were
    /// affected; zero is a valid outcome.
    async fn release(&self, user_id: Uuid) -> AppResult<u64>;

    /// Bump `last_activity` on the caller's active row. `false` when no
    /// such row exists.
    async fn heartbeat(&self, user_id: Uuid) -> AppResult<bool>;

    /// Read-and-clear the caller's most recent kick notice.
    async fn take_kick_notice(&self, user_id: Uuid) -> AppResult<Option<KickedBy>>;

    /// Page through all rows, newest first.
    async fn list_history(&self, limit: i64, offset: i64) -> AppResult<Vec<ConsoleSession>>;

    /// Total rows ever recorded.
    async fn count_all(&self) -> AppResult<i64>;
}

#[async_trait]
impl ConsoleLockStore for ConsoleSessionRepository {
    async fn find_active(&self) -> AppResult<Option<ConsoleSession>> {
        ConsoleSessionRepository::find_active(self).await
    }

    async fn deactivate_stale(&self, cutoff: DateTime<Utc>) -> AppResult<u64> {
        ConsoleSessionRepository::deactivate_stale(self, cutoff).await
    }

    async fn claim(&self, user_id: Uuid, user_name: &str) -> AppResult<ConsoleSession> {
        ConsoleSessionRepository::claim(self, user_id, user_name).await
    }

    async fn release(&self, user_id: Uuid) -> AppResult<u64> {
        ConsoleSessionRepository::release(self, user_id).await
    }

    async fn heartbeat(&self, user_id: Uuid) -> AppResult<bool> {
        ConsoleSessionRepository::heartbeat(self, user_id).await
    }

    async fn take_kick_notice(&self, user_id: Uuid) -> AppResult<Option<KickedBy>> {
        let notice = ConsoleSessionRepository::take_kick_notice(self, user_id).await?;
        Ok(notice.map(|(user_id, user_name)| KickedBy { user_id, user_name }))
    }

    async fn list_history(&self, limit: i64, offset: i64) -> AppResult<Vec<ConsoleSession>> {
        ConsoleSessionRepository::list_history(self, limit, offset).await
    }

    async fn count_all(&self) -> AppResult<i64> {
        ConsoleSessionRepository::count_all(self).await
    }
}
