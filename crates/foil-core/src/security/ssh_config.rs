//! SSH Tunnel Configuration Types
//!
//! A tunnel logs into an SSH server with a private key, listens on a local
//! address and forwards every accepted connection to a target address as
//! seen from the SSH server.

use crate::{FoilError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for establishing an SSH tunnel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SshTunnelConfig {
    /// SSH server hostname or IP address
    pub host: String,
    /// SSH server port (default: 22)
    pub port: u16,
    /// Username for SSH authentication
    pub username: String,
    /// Private key used for public key authentication
    pub private_key_path: PathBuf,
    /// Local address the tunnel listens on (default: 127.0.0.1)
    pub bind_host: String,
    /// Local port the tunnel listens on, 0 picks a free port
    pub bind_port: u16,
    /// Forward target host, resolved on the SSH server
    pub forward_host: String,
    /// Forward target port
    pub forward_port: u16,
    /// Connection timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u32,
    /// Keep-alive interval in seconds (0 to disable)
    #[serde(default)]
    pub keepalive_seconds: u32,
}

fn default_timeout() -> u32 {
    30
}

impl SshTunnelConfig {
    /// Create a new SSH tunnel configuration with private key authentication
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        private_key_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            host: host.into(),
            port: 22,
            username: username.into(),
            private_key_path: private_key_path.into(),
            bind_host: "127.0.0.1".to_string(),
            bind_port: 0,
            forward_host: "127.0.0.1".to_string(),
            forward_port: 0,
            timeout_seconds: default_timeout(),
            keepalive_seconds: 0,
        }
    }

    /// Set the SSH server port
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the local listen address
    pub fn bind(mut self, host: impl Into<String>, port: u16) -> Self {
        self.bind_host = host.into();
        self.bind_port = port;
        self
    }

    /// Set the forward target as seen from the SSH server
    pub fn forward_to(mut self, host: impl Into<String>, port: u16) -> Self {
        self.forward_host = host.into();
        self.forward_port = port;
        self
    }

    /// Set the connection timeout in seconds
    pub fn timeout(mut self, seconds: u32) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// Set the keep-alive interval in seconds
    pub fn keepalive(mut self, seconds: u32) -> Self {
        self.keepalive_seconds = seconds;
        self
    }

    /// Validate the SSH tunnel configuration
    pub fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            return Err(FoilError::Tunnel("SSH host cannot be empty".to_string()));
        }

        if self.port == 0 {
            return Err(FoilError::Tunnel("SSH port cannot be 0".to_string()));
        }

        if self.username.is_empty() {
            return Err(FoilError::Tunnel(
                "SSH username cannot be empty".to_string(),
            ));
        }

        if self.private_key_path.as_os_str().is_empty() {
            return Err(FoilError::Tunnel(
                "SSH private key path cannot be empty".to_string(),
            ));
        }

        if self.forward_host.is_empty() || self.forward_port == 0 {
            return Err(FoilError::Tunnel(
                "SSH forward target must have a host and a non-zero port".to_string(),
            ));
        }

        Ok(())
    }
}
