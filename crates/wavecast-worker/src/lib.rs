//! # wavecast-worker
//!
//! Scheduled background tasks. Currently one: the console lock expiry
//! sweep, which reclaims stale locks even when no client is polling
//! `status`.

pub mod scheduler;

pub use scheduler::CronScheduler;
