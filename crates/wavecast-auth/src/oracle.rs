//! Database-backed permission oracle.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use wavecast_core::result::AppResult;
use wavecast_core::traits::PermissionOracle;
use wavecast_database::repositories::UserRepository;

/// Answers console permission questions from the users table.
///
/// Administrators always qualify; other users need the explicit
/// `console_access` grant. The lookup is per-call on purpose: a revoked
/// grant takes effect at the user's next status poll or claim, with no
/// token reissue required.
#[derive(Debug, Clone)]
pub struct DbPermissionOracle {
    users: Arc<UserRepository>,
}

impl DbPermissionOracle {
    /// Create a new oracle over the user repository.
    pub fn new(users: Arc<UserRepository>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl PermissionOracle for DbPermissionOracle {
    async fn has_console_permission(&self, user_id: Uuid) -> AppResult<bool> {
        let user = self.users.find_by_id(user_id).await?;
        Ok(user.map(|u| u.may_manage_console()).unwrap_or(false))
    }
}
