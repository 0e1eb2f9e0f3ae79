//! # wavecast-api
//!
//! The HTTP surface of Wavecast: Axum router, handlers for the console
//! lock operations, the `AuthUser` extractor, and `AppError` → HTTP
//! response mapping.

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use router::build_router;
pub use state::AppState;
