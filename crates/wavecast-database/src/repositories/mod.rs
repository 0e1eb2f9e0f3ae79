//! Repository implementations, one per aggregate.

pub mod console_session;
pub mod user;

pub use console_session::ConsoleSessionRepository;
pub use user::UserRepository;
