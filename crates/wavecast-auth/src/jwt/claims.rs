//! JWT claims structure embedded in every bearer token.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use wavecast_entity::user::UserRole;

/// Claims payload of a Wavecast bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject — the user ID.
    pub sub: Uuid,
    /// Unique login name.
    pub username: String,
    /// Human-readable display name.
    pub name: String,
    /// User role at the time of token issuance.
    pub role: UserRole,
    /// Issued-at timestamp (seconds since epoch).
    pub iat: i64,
    /// Expiration timestamp (seconds since epoch).
    pub exp: i64,
    /// JWT ID.
    pub jti: Uuid,
}

impl Claims {
    /// Returns the user ID from the subject claim.
    pub fn user_id(&self) -> Uuid {
        self.sub
    }

    /// Whether the token carries the admin role.
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}
