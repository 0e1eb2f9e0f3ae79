//! Permission oracle trait for console lock access decisions.

use async_trait::async_trait;
use uuid::Uuid;

use crate::result::AppResult;

/// Answers whether a user may hold the management lock.
///
/// The coordinator consults the oracle before leaking any lock state
/// (`status`) and again inside `claim`. Implementations are expected to
/// grant access to administrators and to users carrying an explicit
/// console grant.
#[async_trait]
pub trait PermissionOracle: Send + Sync + 'static {
    /// Whether `user_id` may inspect and claim the console lock.
    async fn has_console_permission(&self, user_id: Uuid) -> AppResult<bool>;
}
