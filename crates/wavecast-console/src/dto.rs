//! Wire types for the five lock operations and the admin history view.
//!
//! Serialized camelCase: these shapes are the observable protocol between
//! coordinator and agents, shared by the HTTP handlers and the client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use wavecast_entity::console::ConsoleSession;

/// The caller identity the coordinator acts on behalf of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    /// The caller's user ID.
    pub user_id: Uuid,
    /// Display name, snapshotted into the session row on claim.
    pub display_name: String,
}

impl Caller {
    /// Create a caller identity.
    pub fn new(user_id: Uuid, display_name: impl Into<String>) -> Self {
        Self {
            user_id,
            display_name: display_name.into(),
        }
    }
}

/// Public view of the active session, shown to prospective operators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    /// The holder's user ID.
    pub user_id: Uuid,
    /// The holder's display name.
    pub user_name: String,
    /// When the lock was claimed.
    pub started_at: DateTime<Utc>,
    /// The holder's last heartbeat.
    pub last_activity: DateTime<Utc>,
}

impl From<&ConsoleSession> for SessionSnapshot {
    fn from(session: &ConsoleSession) -> Self {
        Self {
            user_id: session.user_id,
            user_name: session.user_name.clone(),
            started_at: session.started_at,
            last_activity: session.last_activity,
        }
    }
}

/// Result of the `status` operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockStatus {
    /// Whether the caller may hold the lock at all. When `false`, no
    /// session data is included: callers without permission must not learn
    /// who holds the lock.
    pub has_permission: bool,
    /// The current holder, if any.
    pub active_session: Option<SessionSnapshot>,
    /// Whether the current holder is the caller.
    pub is_current_user: bool,
}

impl LockStatus {
    /// The status returned to callers without permission.
    pub fn denied() -> Self {
        Self {
            has_permission: false,
            active_session: None,
            is_current_user: false,
        }
    }
}

/// Result of the `heartbeat` operation. `active == false` means the
/// caller's lock has already expired or been taken over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatStatus {
    /// Whether the caller still holds the lock.
    pub active: bool,
}

/// Who displaced a holder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KickedBy {
    /// The displacing user's ID.
    pub user_id: Uuid,
    /// The displacing user's display name.
    pub user_name: String,
}

/// Result of the `check_kicked` operation. The notice is cleared by the
/// read; a second immediate call reports `kicked: false`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KickNotice {
    /// Whether an unread kick notice existed.
    pub kicked: bool,
    /// Who took the lock, when `kicked` is true.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kicked_by: Option<KickedBy>,
}

impl KickNotice {
    /// An empty notice.
    pub fn none() -> Self {
        Self {
            kicked: false,
            kicked_by: None,
        }
    }
}

/// One row of the admin session-history view.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    /// Session identifier.
    pub id: Uuid,
    /// The holder's user ID.
    pub user_id: Uuid,
    /// The holder's display name at claim time.
    pub user_name: String,
    /// When the lock was claimed.
    pub started_at: DateTime<Utc>,
    /// Last heartbeat while held.
    pub last_activity: DateTime<Utc>,
    /// Whether this row currently holds the lock.
    pub is_active: bool,
    /// Unread kick stamp, if the holder has not seen the notice yet.
    pub kicked_by_user_id: Option<Uuid>,
    /// Display name of the displacing user.
    pub kicked_by_user_name: Option<String>,
}

impl From<ConsoleSession> for HistoryEntry {
    fn from(session: ConsoleSession) -> Self {
        Self {
            id: session.id,
            user_id: session.user_id,
            user_name: session.user_name,
            started_at: session.started_at,
            last_activity: session.last_activity,
            is_active: session.is_active,
            kicked_by_user_id: session.kicked_by_user_id,
            kicked_by_user_name: session.kicked_by_user_name,
        }
    }
}

/// Paged admin history response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryPage {
    /// Session rows, newest first.
    pub sessions: Vec<HistoryEntry>,
    /// Total rows ever recorded.
    pub total: i64,
}
