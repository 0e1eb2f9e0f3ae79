//! Transport-agnostic interface to the five lock operations.

use async_trait::async_trait;

use wavecast_core::result::AppResult;

use crate::dto::{HeartbeatStatus, KickNotice, LockStatus};

/// The lock operations as seen by one caller.
///
/// Implementations are bound to a single identity: the in-process
/// [`crate::coordinator::BoundConsole`] carries an explicit [`crate::dto::Caller`],
/// the HTTP [`crate::client::HttpConsoleClient`] a bearer token. The client
/// agent is generic over this trait, so its state machine is exercised in
/// tests against the real coordinator on the in-memory store.
#[async_trait]
pub trait ConsoleApi: Send + Sync + 'static {
    /// Inspect the lock (runs the expiry sweep server-side).
    async fn status(&self) -> AppResult<LockStatus>;

    /// Acquire the lock, displacing any current holder.
    async fn claim(&self) -> AppResult<()>;

    /// Give up the caller's own lock. Idempotent.
    async fn release(&self) -> AppResult<()>;

    /// Signal liveness; learns whether the lock is still held.
    async fn heartbeat(&self) -> AppResult<HeartbeatStatus>;

    /// Read-and-clear the caller's most recent kick notice.
    async fn check_kicked(&self) -> AppResult<KickNotice>;
}
