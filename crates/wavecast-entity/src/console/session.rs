//! Console management-session entity model.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One claim of the exclusive console lock.
///
/// A row is created on every claim and never deleted; at most one row is
/// active at any instant (partial unique index on `is_active`). The
/// `kicked_by_*` pair is set only when another user's claim displaced this
/// one, and cleared again once the victim has read the notice.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ConsoleSession {
    /// Unique session identifier.
    pub id: Uuid,
    /// The holder's user ID.
    pub user_id: Uuid,
    /// Display-name snapshot taken at claim time.
    pub user_name: String,
    /// When the lock was claimed.
    pub started_at: DateTime<Utc>,
    /// Last heartbeat. Only increases, and only while active.
    pub last_activity: DateTime<Utc>,
    /// Whether this row currently holds the lock.
    pub is_active: bool,
    /// Who displaced this holder, if anyone.
    pub kicked_by_user_id: Option<Uuid>,
    /// Display name of the displacing user.
    pub kicked_by_user_name: Option<String>,
}

impl ConsoleSession {
    /// Whether the holder has gone silent past the inactivity threshold.
    pub fn is_stale(&self, threshold: Duration, now: DateTime<Utc>) -> bool {
        self.is_active && now - self.last_activity > threshold
    }

    /// Whether this row carries an unread kick notice.
    pub fn has_kick_notice(&self) -> bool {
        !self.is_active && self.kicked_by_user_id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(last_activity: DateTime<Utc>, is_active: bool) -> ConsoleSession {
        ConsoleSession {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            user_name: "dj-a".to_string(),
            started_at: last_activity,
            last_activity,
            is_active,
            kicked_by_user_id: None,
            kicked_by_user_name: None,
        }
    }

    #[test]
    fn staleness_respects_threshold() {
        let now = Utc::now();
        let fresh = session(now - Duration::seconds(60), true);
        let stale = session(now - Duration::seconds(360), true);
        let threshold = Duration::seconds(300);

        assert!(!fresh.is_stale(threshold, now));
        assert!(stale.is_stale(threshold, now));
    }

    #[test]
    fn inactive_rows_are_never_stale() {
        let now = Utc::now();
        let old_inactive = session(now - Duration::seconds(3600), false);
        assert!(!old_inactive.is_stale(Duration::seconds(300), now));
    }
}
