//! # wavecast-auth
//!
//! Identity and permission plumbing. Wavecast does not handle credentials;
//! it consumes signed bearer tokens minted elsewhere and answers the one
//! permission question the console core asks: may this user hold the lock?

pub mod jwt;
pub mod oracle;

pub use oracle::DbPermissionOracle;
