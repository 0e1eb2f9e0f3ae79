//! Console session repository — the Postgres side of the exclusive lock.
//!
//! Mutual exclusion rests on the partial unique index
//! `console_sessions_single_active` (at most one row with
//! `is_active = TRUE`). A claim that races another claim loses at the
//! INSERT and surfaces as a Conflict for the caller to retry.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use wavecast_core::error::{AppError, ErrorKind};
use wavecast_core::result::AppResult;
use wavecast_entity::console::ConsoleSession;

/// Repository for console lock session rows.
#[derive(Debug, Clone)]
pub struct ConsoleSessionRepository {
    pool: PgPool,
}

impl ConsoleSessionRepository {
    /// Create a new console session repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Return the currently active session row, if any.
    pub async fn find_active(&self) -> AppResult<Option<ConsoleSession>> {
        sqlx::query_as::<_, ConsoleSession>(
            "SELECT * FROM console_sessions WHERE is_active LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to find active session", e)
        })
    }

    /// Deactivate any active row whose holder has gone silent.
    ///
    /// This is the expiry sweep: no kick stamp is written, because a
    /// timeout is not an eviction.
    pub async fn deactivate_stale(&self, cutoff: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE console_sessions SET is_active = FALSE \
             WHERE is_active AND last_activity < $1",
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to sweep stale sessions", e)
        })?;

        Ok(result.rows_affected())
    }

    /// Claim the lock for `user_id`, displacing any current holder.
    ///
    /// One transaction: another user's active row is deactivated and
    /// stamped with the claimer's identity; the claimer's own active rows
    /// are deactivated without a stamp (self-reclaim after a reload is not
    /// a kick); a fresh active row is inserted. If a concurrent claim
    /// commits first, the insert trips the partial unique index and the
    /// whole transaction rolls back with a Conflict.
    pub async fn claim(&self, user_id: Uuid, user_name: &str) -> AppResult<ConsoleSession> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin claim transaction", e)
        })?;

        sqlx::query(
            "UPDATE console_sessions \
             SET is_active = FALSE, kicked_by_user_id = $1, kicked_by_user_name = $2 \
             WHERE is_active AND user_id <> $1",
        )
        .bind(user_id)
        .bind(user_name)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to displace current holder", e)
        })?;

        sqlx::query(
            "UPDATE console_sessions SET is_active = FALSE \
             WHERE is_active AND user_id = $1",
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to reclaim own session", e)
        })?;

        let session = sqlx::query_as::<_, ConsoleSession>(
            "INSERT INTO console_sessions (id, user_id, user_name, started_at, last_activity, is_active) \
             VALUES ($1, $2, $3, NOW(), NOW(), TRUE) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(user_name)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_claim_error)?;

        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit claim", e)
        })?;

        Ok(session)
    }

    /// Deactivate the caller's own active rows. Idempotent: zero affected
    /// rows is a valid outcome, not an error.
    pub async fn release(&self, user_id: Uuid) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE console_sessions SET is_active = FALSE \
             WHERE is_active AND user_id = $1",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to release session", e)
        })?;

        Ok(result.rows_affected())
    }

    /// Bump `last_activity` on the caller's active row.
    ///
    /// Returns `false` when no such row exists — the caller's lock has
    /// expired or been taken over. That is a defined signal, not an error.
    pub async fn heartbeat(&self, user_id: Uuid) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE console_sessions SET last_activity = NOW() \
             WHERE is_active AND user_id = $1",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to record heartbeat", e)
        })?;

        Ok(result.rows_affected() > 0)
    }

    /// Read-and-clear the caller's most recent kick notice.
    ///
    /// Only the newest (by `started_at`) stamped row is reported and
    /// cleared; older stamped rows stay as history. Single statement, so
    /// delivery is at-most-once even under concurrent polls.
    pub async fn take_kick_notice(&self, user_id: Uuid) -> AppResult<Option<(Uuid, String)>> {
        let row: Option<(Option<Uuid>, Option<String>)> = sqlx::query_as(
            "WITH victim AS ( \
                 SELECT id, kicked_by_user_id, kicked_by_user_name \
                 FROM console_sessions \
                 WHERE user_id = $1 AND NOT is_active AND kicked_by_user_id IS NOT NULL \
                 ORDER BY started_at DESC \
                 LIMIT 1 \
                 FOR UPDATE \
             ), cleared AS ( \
                 UPDATE console_sessions s \
                 SET kicked_by_user_id = NULL, kicked_by_user_name = NULL \
                 FROM victim v \
                 WHERE s.id = v.id \
             ) \
             SELECT kicked_by_user_id, kicked_by_user_name FROM victim",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to take kick notice", e)
        })?;

        Ok(row.and_then(|(id, name)| {
            id.map(|id| (id, name.unwrap_or_default()))
        }))
    }

    /// Page through all session rows, newest first (admin history view).
    pub async fn list_history(&self, limit: i64, offset: i64) -> AppResult<Vec<ConsoleSession>> {
        sqlx::query_as::<_, ConsoleSession>(
            "SELECT * FROM console_sessions ORDER BY started_at DESC LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to list session history", e)
        })
    }

    /// Count all session rows ever recorded.
    pub async fn count_all(&self) -> AppResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM console_sessions")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to count sessions", e)
            })
    }
}

/// Distinguish a lost claim race (unique violation on the single-active
/// index) from other database failures.
fn map_claim_error(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            return AppError::conflict("Lock claim lost a race with a concurrent claim");
        }
    }
    AppError::with_source(ErrorKind::Database, "Failed to insert claim row", e)
}
