//! In-memory lock store using a Tokio mutex for single-node deployments.

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use async_trait::async_trait;

use wavecast_core::result::AppResult;
use wavecast_entity::console::ConsoleSession;

use crate::dto::KickedBy;
use crate::store::ConsoleLockStore;

/// In-memory implementation of [`ConsoleLockStore`].
///
/// One mutex guards the whole table, so `claim` is trivially atomic.
/// Suitable for single-node deployments and tests; multi-instance
/// deployments need the Postgres store.
#[derive(Debug, Default)]
pub struct MemoryLockStore {
    /// All session rows, in insertion order.
    rows: Mutex<Vec<ConsoleSession>>,
}

impl MemoryLockStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Backdate the active row's `last_activity` for a user. Test support
    /// for exercising the expiry sweep.
    #[cfg(test)]
    pub(crate) async fn backdate_activity(&self, user_id: Uuid, to: DateTime<Utc>) {
        let mut rows = self.rows.lock().await;
        for row in rows.iter_mut().filter(|r| r.is_active && r.user_id == user_id) {
            row.last_activity = to;
        }
    }
}

#[async_trait]
impl ConsoleLockStore for MemoryLockStore {
    async fn find_active(&self) -> AppResult<Option<ConsoleSession>> {
        let rows = self.rows.lock().await;
        Ok(rows.iter().find(|r| r.is_active).cloned())
    }

    async fn deactivate_stale(&self, cutoff: DateTime<Utc>) -> AppResult<u64> {
        let mut rows = self.rows.lock().await;
        let mut swept = 0;
        for row in rows.iter_mut() {
            if row.is_active && row.last_activity < cutoff {
                row.is_active = false;
                swept += 1;
            }
        }
        Ok(swept)
    }

    async fn claim(&self, user_id: Uuid, user_name: &str) -> AppResult<ConsoleSession> {
        let mut rows = self.rows.lock().await;

        for row in rows.iter_mut().filter(|r| r.is_active) {
            row.is_active = false;
            if row.user_id != user_id {
                row.kicked_by_user_id = Some(user_id);
                row.kicked_by_user_name = Some(user_name.to_string());
            }
        }

        let now = Utc::now();
        let session = ConsoleSession {
            id: Uuid::new_v4(),
            user_id,
            user_name: user_name.to_string(),
            started_at: now,
            last_activity: now,
            is_active: true,
            kicked_by_user_id: None,
            kicked_by_user_name: None,
        };
        rows.push(session.clone());

        Ok(session)
    }

    async fn release(&self, user_id: Uuid) -> AppResult<u64> {
        let mut rows = self.rows.lock().await;
        let mut released = 0;
        for row in rows.iter_mut() {
            if row.is_active && row.user_id == user_id {
                row.is_active = false;
                released += 1;
            }
        }
        Ok(released)
    }

    async fn heartbeat(&self, user_id: Uuid) -> AppResult<bool> {
        let mut rows = self.rows.lock().await;
        match rows.iter_mut().find(|r| r.is_active && r.user_id == user_id) {
            Some(row) => {
                row.last_activity = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn take_kick_notice(&self, user_id: Uuid) -> AppResult<Option<KickedBy>> {
        let mut rows = self.rows.lock().await;
        let victim = rows
            .iter_mut()
            .filter(|r| r.user_id == user_id && r.has_kick_notice())
            .max_by_key(|r| r.started_at);

        Ok(victim.and_then(|row| {
            let kicked_by_user_id = row.kicked_by_user_id.take()?;
            let kicked_by_user_name = row.kicked_by_user_name.take().unwrap_or_default();
            Some(KickedBy {
                user_id: kicked_by_user_id,
                user_name: kicked_by_user_name,
            })
        }))
    }

    async fn list_history(&self, limit: i64, offset: i64) -> AppResult<Vec<ConsoleSession>> {
        let rows = self.rows.lock().await;
        let mut all: Vec<ConsoleSession> = rows.clone();
        all.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(all
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn count_all(&self) -> AppResult<i64> {
        let rows = self.rows.lock().await;
        Ok(rows.len() as i64)
    }
}
