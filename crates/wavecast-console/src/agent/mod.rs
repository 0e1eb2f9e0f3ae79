//! Client-side session agent.
//!
//! Each connected operator runs one agent: a state machine deciding which
//! prompt to show (confirm entry, takeover, kicked, timed out) and, while
//! active, driving the heartbeat, kick-check, and inactivity timers.
//!
//! The machine itself ([`state`]) is pure — phase plus event in, phase
//! plus effects out — so the full transition table is unit-testable. The
//! [`driver`] owns the timers and executes effects against a
//! [`crate::api::ConsoleApi`].

pub mod driver;
pub mod state;

pub use driver::{AgentHandle, ConsoleAgent, UserInput};
pub use state::{AgentEvent, AgentPhase, Effect, Transition, transition};
