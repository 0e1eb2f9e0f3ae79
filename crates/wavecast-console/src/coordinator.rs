//! Server-side lock coordinator.
//!
//! Stateless over the store: correctness comes from the store's
//! single-active-row invariant, never from in-process caches, so any
//! number of coordinator instances may serve the same station.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tracing::{debug, info};

use wavecast_core::config::console::ConsoleConfig;
use wavecast_core::error::AppError;
use wavecast_core::result::AppResult;
use wavecast_core::traits::PermissionOracle;

use crate::api::ConsoleApi;
use crate::dto::{
    Caller, HeartbeatStatus, HistoryPage, KickNotice, LockStatus, SessionSnapshot,
};
use crate::store::ConsoleLockStore;

/// Coordinates the exclusive console lock.
pub struct ConsoleCoordinator {
    /// Session persistence.
    store: Arc<dyn ConsoleLockStore>,
    /// Permission oracle consulted by `status` and `claim`.
    oracle: Arc<dyn PermissionOracle>,
    /// Timing contract.
    config: ConsoleConfig,
}

impl std::fmt::Debug for ConsoleCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleCoordinator")
            .field("config", &self.config)
            .finish()
    }
}

impl ConsoleCoordinator {
    /// Create a coordinator over the given store and oracle.
    pub fn new(
        store: Arc<dyn ConsoleLockStore>,
        oracle: Arc<dyn PermissionOracle>,
        config: ConsoleConfig,
    ) -> Self {
        Self {
            store,
            oracle,
            config,
        }
    }

    /// Bind the coordinator to one caller, yielding a [`ConsoleApi`] handle.
    pub fn bind(coordinator: Arc<Self>, caller: Caller) -> BoundConsole {
        BoundConsole {
            inner: coordinator,
            caller,
        }
    }

    /// Inspect the lock on behalf of `caller`.
    ///
    /// Callers without permission learn nothing about the holder. For
    /// permitted callers the expiry sweep runs first, so a silent holder
    /// never outlives the inactivity threshold by more than one status
    /// poll.
    pub async fn status(&self, caller: &Caller) -> AppResult<LockStatus> {
        if !self.oracle.has_console_permission(caller.user_id).await? {
            return Ok(LockStatus::denied());
        }

        self.sweep_expired().await?;

        let active = self.store.find_active().await?;
        let is_current_user = active
            .as_ref()
            .map(|s| s.user_id == caller.user_id)
            .unwrap_or(false);

        Ok(LockStatus {
            has_permission: true,
            active_session: active.as_ref().map(SessionSnapshot::from),
            is_current_user,
        })
    }

    /// Acquire the lock for `caller`, displacing any current holder.
    ///
    /// The oracle is re-checked here: this operation is callable directly,
    /// not only after a `status`.
    pub async fn claim(&self, caller: &Caller) -> AppResult<()> {
        if !self.oracle.has_console_permission(caller.user_id).await? {
            return Err(AppError::forbidden("Console access required"));
        }

        let session = self
            .store
            .claim(caller.user_id, &caller.display_name)
            .await?;

        info!(
            user_id = %caller.user_id,
            session_id = %session.id,
            "Console lock claimed"
        );
        Ok(())
    }

    /// Give up the caller's own lock. Releasing with no active row is a
    /// no-op, not an error.
    pub async fn release(&self, caller: &Caller) -> AppResult<()> {
        let released = self.store.release(caller.user_id).await?;
        if released > 0 {
            info!(user_id = %caller.user_id, "Console lock released");
        }
        Ok(())
    }

    /// Record liveness for the caller's lock.
    ///
    /// `active: false` is the StaleHeartbeat signal: the lock has already
    /// expired or been taken over, and the agent should stop treating
    /// itself as the holder.
    pub async fn heartbeat(&self, caller: &Caller) -> AppResult<HeartbeatStatus> {
        let active = self.store.heartbeat(caller.user_id).await?;
        if !active {
            debug!(user_id = %caller.user_id, "Heartbeat without an active lock");
        }
        Ok(HeartbeatStatus { active })
    }

    /// Read-and-clear the caller's most recent kick notice.
    pub async fn check_kicked(&self, caller: &Caller) -> AppResult<KickNotice> {
        match self.store.take_kick_notice(caller.user_id).await? {
            Some(kicked_by) => Ok(KickNotice {
                kicked: true,
                kicked_by: Some(kicked_by),
            }),
            None => Ok(KickNotice::none()),
        }
    }

    /// Page through the session history, newest first (admin view).
    pub async fn history(&self, limit: i64, offset: i64) -> AppResult<HistoryPage> {
        let limit = limit.clamp(1, self.config.history_page_size as i64);
        let sessions = self.store.list_history(limit, offset.max(0)).await?;
        let total = self.store.count_all().await?;

        Ok(HistoryPage {
            sessions: sessions.into_iter().map(Into::into).collect(),
            total,
        })
    }

    /// Deactivate any holder whose last heartbeat is older than the
    /// inactivity threshold. Also run periodically by the worker so stale
    /// locks are reclaimed even when nobody polls `status`.
    pub async fn sweep_expired(&self) -> AppResult<u64> {
        let cutoff =
            Utc::now() - Duration::seconds(self.config.inactivity_threshold_seconds as i64);
        let swept = self.store.deactivate_stale(cutoff).await?;
        if swept > 0 {
            info!(swept, "Deactivated stale console sessions");
        }
        Ok(swept)
    }
}

/// A [`ConsoleCoordinator`] bound to one caller identity.
///
/// This is the in-process [`ConsoleApi`] transport, used by server-local
/// agents and by tests.
#[derive(Debug, Clone)]
pub struct BoundConsole {
    inner: Arc<ConsoleCoordinator>,
    caller: Caller,
}

#[async_trait]
impl ConsoleApi for BoundConsole {
    async fn status(&self) -> AppResult<LockStatus> {
        self.inner.status(&self.caller).await
    }

    async fn claim(&self) -> AppResult<()> {
        self.inner.claim(&self.caller).await
    }

    async fn release(&self) -> AppResult<()> {
        self.inner.release(&self.caller).await
    }

    async fn heartbeat(&self) -> AppResult<HeartbeatStatus> {
        self.inner.heartbeat(&self.caller).await
    }

    async fn check_kicked(&self) -> AppResult<KickNotice> {
        self.inner.check_kicked(&self.caller).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryLockStore;
    use crate::test_support::{caller, AllowListOracle};
    use futures::future::join_all;
    use uuid::Uuid;

    fn fixture() -> (Arc<MemoryLockStore>, Arc<ConsoleCoordinator>) {
        let store = Arc::new(MemoryLockStore::new());
        let coordinator = Arc::new(ConsoleCoordinator::new(
            store.clone(),
            Arc::new(AllowListOracle::allow_all()),
            ConsoleConfig::default(),
        ));
        (store, coordinator)
    }

    async fn active_rows(store: &MemoryLockStore) -> Vec<wavecast_entity::console::ConsoleSession> {
        store
            .list_history(1000, 0)
            .await
            .expect("history")
            .into_iter()
            .filter(|r| r.is_active)
            .collect()
    }

    #[tokio::test]
    async fn concurrent_claims_leave_one_active_row() {
        let (store, coordinator) = fixture();

        let claims = (0..8)
            .map(|i| {
                let coordinator = coordinator.clone();
                let who = caller(&format!("dj-{i}"));
                async move { coordinator.claim(&who).await }
            })
            .collect::<Vec<_>>();

        for result in join_all(claims).await {
            result.expect("claim");
        }

        assert_eq!(active_rows(&store).await.len(), 1);
    }

    #[tokio::test]
    async fn takeover_stamps_exactly_one_victim() {
        let (store, coordinator) = fixture();
        let a = caller("dj-a");
        let b = caller("dj-b");

        coordinator.claim(&a).await.expect("claim a");
        coordinator.claim(&b).await.expect("claim b");

        let history = store.list_history(10, 0).await.expect("history");
        let stamped: Vec<_> = history
            .iter()
            .filter(|r| r.kicked_by_user_id.is_some())
            .collect();

        assert_eq!(stamped.len(), 1);
        assert_eq!(stamped[0].user_id, a.user_id);
        assert!(!stamped[0].is_active);
        assert_eq!(stamped[0].kicked_by_user_id, Some(b.user_id));
        assert_eq!(stamped[0].kicked_by_user_name.as_deref(), Some("dj-b"));
    }

    #[tokio::test]
    async fn self_reclaim_does_not_kick() {
        let (store, coordinator) = fixture();
        let a = caller("dj-a");

        coordinator.claim(&a).await.expect("first claim");
        coordinator.claim(&a).await.expect("reload claim");

        let history = store.list_history(10, 0).await.expect("history");
        assert_eq!(history.len(), 2);
        assert!(history.iter().all(|r| r.kicked_by_user_id.is_none()));
        assert_eq!(active_rows(&store).await.len(), 1);
    }

    #[tokio::test]
    async fn release_is_idempotent() {
        let (store, coordinator) = fixture();
        let a = caller("dj-a");

        coordinator.release(&a).await.expect("release with no lock");

        coordinator.claim(&a).await.expect("claim");
        coordinator.release(&a).await.expect("first release");
        coordinator.release(&a).await.expect("second release");

        assert!(active_rows(&store).await.is_empty());
    }

    #[tokio::test]
    async fn kick_notice_is_read_and_clear() {
        let (_store, coordinator) = fixture();
        let a = caller("dj-a");
        let b = caller("dj-b");

        coordinator.claim(&a).await.expect("claim a");
        coordinator.claim(&b).await.expect("claim b");

        let first = coordinator.check_kicked(&a).await.expect("first check");
        assert!(first.kicked);
        assert_eq!(
            first.kicked_by.as_ref().map(|k| k.user_id),
            Some(b.user_id)
        );

        let second = coordinator.check_kicked(&a).await.expect("second check");
        assert!(!second.kicked);
        assert!(second.kicked_by.is_none());
    }

    #[tokio::test]
    async fn only_most_recent_kick_is_reported() {
        let (store, coordinator) = fixture();
        let a = caller("dj-a");
        let b = caller("dj-b");
        let c = caller("dj-c");

        // A is kicked twice without ever polling in between.
        coordinator.claim(&a).await.expect("claim a");
        coordinator.claim(&b).await.expect("b takes over");
        coordinator.claim(&a).await.expect("a returns");
        coordinator.claim(&c).await.expect("c takes over");

        let notice = coordinator.check_kicked(&a).await.expect("check");
        assert_eq!(notice.kicked_by.map(|k| k.user_id), Some(c.user_id));

        // The older stamp stays on its row as history.
        let history = store.list_history(10, 0).await.expect("history");
        let still_stamped: Vec<_> = history
            .iter()
            .filter(|r| r.kicked_by_user_id.is_some())
            .collect();
        assert_eq!(still_stamped.len(), 1);
        assert_eq!(still_stamped[0].kicked_by_user_id, Some(b.user_id));
    }

    #[tokio::test]
    async fn status_sweeps_expired_holder() {
        let (store, coordinator) = fixture();
        let a = caller("dj-a");
        let b = caller("dj-b");

        coordinator.claim(&a).await.expect("claim a");
        store
            .backdate_activity(a.user_id, Utc::now() - Duration::minutes(6))
            .await;

        let status = coordinator.status(&b).await.expect("status");
        assert!(status.has_permission);
        assert!(status.active_session.is_none());
        assert!(!status.is_current_user);

        coordinator.claim(&b).await.expect("claim after expiry");

        // Expiry is a timeout, not an eviction: A's row carries no stamp.
        let history = store.list_history(10, 0).await.expect("history");
        let a_row = history
            .iter()
            .find(|r| r.user_id == a.user_id)
            .expect("a row");
        assert!(a_row.kicked_by_user_id.is_none());
    }

    #[tokio::test]
    async fn heartbeat_reflects_loss_after_takeover() {
        let (_store, coordinator) = fixture();
        let a = caller("dj-a");
        let b = caller("dj-b");

        coordinator.claim(&a).await.expect("claim a");
        assert!(coordinator.heartbeat(&a).await.expect("hb a").active);

        coordinator.claim(&b).await.expect("claim b");
        assert!(!coordinator.heartbeat(&a).await.expect("hb a lost").active);
        assert!(coordinator.heartbeat(&b).await.expect("hb b").active);
    }

    #[tokio::test]
    async fn denied_caller_learns_nothing() {
        let store = Arc::new(MemoryLockStore::new());
        let a = caller("dj-a");
        let outsider = caller("listener");
        let coordinator = Arc::new(ConsoleCoordinator::new(
            store.clone(),
            Arc::new(AllowListOracle::allowing([a.user_id])),
            ConsoleConfig::default(),
        ));

        coordinator.claim(&a).await.expect("claim a");

        let status = coordinator.status(&outsider).await.expect("status");
        assert!(!status.has_permission);
        assert!(status.active_session.is_none());

        let err = coordinator.claim(&outsider).await.expect_err("claim");
        assert_eq!(err.kind, wavecast_core::error::ErrorKind::Forbidden);

        // The holder is untouched by the denied attempt.
        assert_eq!(active_rows(&store).await[0].user_id, a.user_id);
    }

    /// The full takeover scenario from the protocol contract.
    #[tokio::test]
    async fn takeover_scenario_end_to_end() {
        let (_store, coordinator) = fixture();
        let a = caller("dj-a");
        let b = caller("dj-b");

        coordinator.claim(&a).await.expect("a claims");

        let a_view = coordinator.status(&a).await.expect("a status");
        assert!(a_view.is_current_user);

        let b_view = coordinator.status(&b).await.expect("b status");
        assert!(!b_view.is_current_user);
        assert_eq!(
            b_view.active_session.as_ref().map(|s| s.user_name.as_str()),
            Some("dj-a")
        );

        coordinator.claim(&b).await.expect("b claims");

        assert!(!coordinator.heartbeat(&a).await.expect("a hb").active);

        let notice = coordinator.check_kicked(&a).await.expect("a check");
        assert!(notice.kicked);
        assert_eq!(
            notice.kicked_by.as_ref().map(|k| k.user_name.as_str()),
            Some("dj-b")
        );

        let again = coordinator.check_kicked(&a).await.expect("a recheck");
        assert!(!again.kicked);
    }
}
