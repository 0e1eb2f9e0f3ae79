//! User entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::role::UserRole;

/// A registered user in the Wavecast system.
///
/// Credential data is owned by the external identity provider; this row
/// carries only what the station needs for display and permissions.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    /// Unique user identifier.
    pub id: Uuid,
    /// Unique login name.
    pub username: String,
    /// Human-readable display name.
    pub display_name: Option<String>,
    /// User role.
    pub role: UserRole,
    /// Explicit console grant for non-admin users.
    pub console_access: bool,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Whether this user may hold the management lock.
    pub fn may_manage_console(&self) -> bool {
        self.role.is_admin() || self.console_access
    }

    /// The name shown to other operators.
    pub fn visible_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.username)
    }
}
