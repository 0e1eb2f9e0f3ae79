//! # wavecast-console
//!
//! The exclusive management-session lock. At most one operator at a time
//! controls the station's live console; everyone else is offered takeover.
//!
//! Server side: [`ConsoleCoordinator`] exposes the five lock operations
//! (status, claim, release, heartbeat, check-kicked) over any
//! [`store::ConsoleLockStore`]. Ownership is decided entirely by the
//! store's single-active-row invariant — there is no process-local holder
//! cache, so any number of server instances coordinate correctly.
//!
//! Client side: [`agent::ConsoleAgent`] runs the operator-facing state
//! machine — confirm entry, takeover prompt, active (with heartbeat,
//! kick-check, and inactivity timers), kicked, and timeout — against any
//! [`api::ConsoleApi`] transport.

pub mod agent;
pub mod api;
pub mod client;
pub mod coordinator;
pub mod dto;
pub mod memory;
pub mod store;

#[cfg(test)]
pub(crate) mod test_support;

pub use agent::{AgentHandle, AgentPhase, ConsoleAgent};
pub use api::ConsoleApi;
pub use coordinator::{BoundConsole, ConsoleCoordinator};
pub use dto::{Caller, HeartbeatStatus, KickNotice, KickedBy, LockStatus, SessionSnapshot};
pub use memory::MemoryLockStore;
