//! Authentication configuration.

use serde::{Deserialize, Serialize};

/// Authentication configuration.
///
/// Wavecast consumes identity from signed bearer tokens; it does not issue
/// credentials itself. The secret here must match whatever service mints
/// the tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret for JWT verification (HS256).
    pub jwt_secret: String,
    /// Access token TTL in minutes (used when minting tokens in tooling
    /// and tests).
    #[serde(default = "default_access_ttl")]
    pub jwt_access_ttl_minutes: u64,
    /// Clock-skew leeway in seconds for expiry validation.
    #[serde(default = "default_leeway")]
    pub jwt_leeway_seconds: u64,
}

fn default_access_ttl() -> u64 {
    60
}

fn default_leeway() -> u64 {
    5
}
