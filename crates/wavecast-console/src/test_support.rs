//! Shared fixtures for coordinator and agent tests.

use std::collections::HashSet;

use async_trait::async_trait;
use uuid::Uuid;

use wavecast_core::result::AppResult;
use wavecast_core::traits::PermissionOracle;

use crate::dto::Caller;

/// Oracle over a fixed allowlist. An empty list means everyone qualifies.
pub struct AllowListOracle {
    allowed: Option<HashSet<Uuid>>,
}

impl AllowListOracle {
    pub fn allow_all() -> Self {
        Self { allowed: None }
    }

    pub fn allowing(users: impl IntoIterator<Item = Uuid>) -> Self {
        Self {
            allowed: Some(users.into_iter().collect()),
        }
    }
}

#[async_trait]
impl PermissionOracle for AllowListOracle {
    async fn has_console_permission(&self, user_id: Uuid) -> AppResult<bool> {
        Ok(match &self.allowed {
            None => true,
            Some(set) => set.contains(&user_id),
        })
    }
}

/// A caller with a fresh ID and the given display name.
pub fn caller(name: &str) -> Caller {
    Caller::new(Uuid::new_v4(), name)
}
