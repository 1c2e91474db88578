//! SSH tunnel configuration and the tunnel seam
//!
//! The connection manager never talks to an SSH library directly. It builds
//! an [`SshTunnelConfig`] and hands it to a [`TunnelOpener`].

mod ssh_config;
mod tunnel;

pub use ssh_config::*;
pub use tunnel::*;
