//! Management console lock configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Timing contract for the exclusive console lock.
///
/// These constants are part of the observable protocol: the server's expiry
/// sweep and the client agent's timers must agree on them, so both sides
/// read the same section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleConfig {
    /// Inactivity threshold in seconds. An active session whose last
    /// heartbeat is older than this is deactivated by the sweep; the client
    /// agent mirrors it as its local inactivity deadline.
    #[serde(default = "default_inactivity_threshold")]
    pub inactivity_threshold_seconds: u64,
    /// Heartbeat interval in seconds for the active holder.
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_seconds: u64,
    /// Kick-notice polling interval in seconds for the active holder.
    #[serde(default = "default_kick_check_interval")]
    pub kick_check_interval_seconds: u64,
    /// Page size for the admin session-history listing.
    #[serde(default = "default_history_page_size")]
    pub history_page_size: u32,
}

impl ConsoleConfig {
    /// Inactivity threshold as a [`Duration`].
    pub fn inactivity_threshold(&self) -> Duration {
        Duration::from_secs(self.inactivity_threshold_seconds)
    }

    /// Heartbeat interval as a [`Duration`].
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_seconds)
    }

    /// Kick-check interval as a [`Duration`].
    pub fn kick_check_interval(&self) -> Duration {
        Duration::from_secs(self.kick_check_interval_seconds)
    }
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            inactivity_threshold_seconds: default_inactivity_threshold(),
            heartbeat_interval_seconds: default_heartbeat_interval(),
            kick_check_interval_seconds: default_kick_check_interval(),
            history_page_size: default_history_page_size(),
        }
    }
}

fn default_inactivity_threshold() -> u64 {
    300
}

fn default_heartbeat_interval() -> u64 {
    15
}

fn default_kick_check_interval() -> u64 {
    5
}

fn default_history_page_size() -> u32 {
    50
}
