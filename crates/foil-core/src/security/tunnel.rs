//! Tunnel traits implemented by the SSH layer

use crate::{Result, SshTunnelConfig};

/// An open port forward
pub trait Tunnel: Send {
    /// Port the tunnel is listening on locally
    fn local_port(&self) -> u16;

    /// Stop forwarding and release the SSH session
    fn close(self) -> Result<()>;
}

/// Something that can open a [`Tunnel`] for a config
pub trait TunnelOpener {
    type Tunnel: Tunnel;

    /// Open a tunnel. Blocks until the tunnel is listening or has failed.
    fn open_tunnel(&self, config: &SshTunnelConfig) -> Result<Self::Tunnel>;
}
