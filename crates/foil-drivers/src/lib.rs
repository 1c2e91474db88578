//! Foil Drivers - database driver and SSH tunnel implementations
//!
//! This crate provides concrete implementations of the collaborator traits
//! defined in `foil-core`.

#[cfg(feature = "mongodb")]
pub use foil_driver_mongodb as mongodb;

pub mod ssh;

pub use ssh::{SshTunnel, SshTunnelError, SshTunnelOpener};

/// Re-export commonly used types from foil-core
pub use foil_core::{
    DatabaseClient, DatabaseDriver, DriverTarget, FoilError, Result, SshTunnelConfig, Tunnel,
    TunnelOpener,
};
