//! Console lock entities.

pub mod session;

pub use session::ConsoleSession;
