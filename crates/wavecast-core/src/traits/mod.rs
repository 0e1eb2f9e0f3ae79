//! Collaborator traits consumed by the console lock core.

pub mod oracle;

pub use oracle::PermissionOracle;
