//! Connection parameters before and after validation
//!
//! Resolution happens in two phases. The merge phase (see `resolver`)
//! produces a [`PartialDescriptor`] in which any field may be missing.
//! [`PartialDescriptor::validate`] is the strict gate run right before a
//! connection attempt; it turns the partial record into a
//! [`ConnectionDescriptor`] or names the first field that is missing.

use crate::{DriverTarget, FoilError, Result, SshTunnelConfig, expand_path};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Local address the tunnel listens on
pub const TUNNEL_BIND_HOST: &str = "0.0.0.0";

/// Address the tunnel forwards to, as seen from the SSH server
pub const TUNNEL_FORWARD_HOST: &str = "127.0.0.1";

/// Connection parameters where every field is optional
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialDescriptor {
    pub address: Option<String>,
    pub port: Option<i64>,
    pub timeout_ms: Option<i64>,
    pub database_name: Option<String>,
    pub use_tunnel: Option<bool>,
    pub tunnel_host: Option<String>,
    pub tunnel_port: Option<i64>,
    pub tunnel_username: Option<String>,
    pub private_key_path: Option<String>,
    pub remote_port: Option<i64>,
}

impl PartialDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn with_port(mut self, port: i64) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: i64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn with_database_name(mut self, name: impl Into<String>) -> Self {
        self.database_name = Some(name.into());
        self
    }

    /// Enable the SSH tunnel and set all of its parameters
    pub fn with_tunnel(
        mut self,
        host: impl Into<String>,
        port: i64,
        username: impl Into<String>,
        private_key_path: impl Into<String>,
        remote_port: i64,
    ) -> Self {
        self.use_tunnel = Some(true);
        self.tunnel_host = Some(host.into());
        self.tunnel_port = Some(port);
        self.tunnel_username = Some(username.into());
        self.private_key_path = Some(private_key_path.into());
        self.remote_port = Some(remote_port);
        self
    }

    pub fn without_tunnel(mut self) -> Self {
        self.use_tunnel = Some(false);
        self
    }

    /// Field-by-field fallback: keep every set field, fill the rest from `fallback`
    pub fn or(&self, fallback: &PartialDescriptor) -> PartialDescriptor {
        PartialDescriptor {
            address: self.address.clone().or_else(|| fallback.address.clone()),
            port: self.port.or(fallback.port),
            timeout_ms: self.timeout_ms.or(fallback.timeout_ms),
            database_name: self
                .database_name
                .clone()
                .or_else(|| fallback.database_name.clone()),
            use_tunnel: self.use_tunnel.or(fallback.use_tunnel),
            tunnel_host: self
                .tunnel_host
                .clone()
                .or_else(|| fallback.tunnel_host.clone()),
            tunnel_port: self.tunnel_port.or(fallback.tunnel_port),
            tunnel_username: self
                .tunnel_username
                .clone()
                .or_else(|| fallback.tunnel_username.clone()),
            private_key_path: self
                .private_key_path
                .clone()
                .or_else(|| fallback.private_key_path.clone()),
            remote_port: self.remote_port.or(fallback.remote_port),
        }
    }

    /// Check required fields and ranges and build the typed descriptor.
    ///
    /// `address`, `port` and `timeout` are always required. An unset
    /// `use_tunnel` means no tunnel; when it is set to true every tunnel
    /// field is required too. Errors name the offending field, with tunnel
    /// fields prefixed by `tunnel.`.
    pub fn validate(&self) -> Result<ConnectionDescriptor> {
        let address = required_text(&self.address, "address")?;
        let port = required_port(self.port, "port")?;
        let timeout_ms = match self.timeout_ms {
            None => return Err(FoilError::IncompleteDescriptor { field: "timeout" }),
            Some(ms) if ms <= 0 => {
                return Err(FoilError::InvalidDescriptor {
                    field: "timeout",
                    reason: format!("{}ms is not greater than zero", ms),
                });
            }
            Some(ms) => ms as u64,
        };

        let tunnel = if self.use_tunnel.unwrap_or(false) {
            Some(TunnelDescriptor {
                host: required_text(&self.tunnel_host, "tunnel.host")?,
                port: required_port(self.tunnel_port, "tunnel.port")?,
                username: required_text(&self.tunnel_username, "tunnel.username")?,
                private_key_path: expand_path(required_text(
                    &self.private_key_path,
                    "tunnel.private_key_path",
                )?),
                remote_port: required_port(self.remote_port, "tunnel.remote_port")?,
            })
        } else {
            None
        };

        Ok(ConnectionDescriptor {
            address,
            port,
            timeout_ms,
            database_name: self.database_name.clone().filter(|name| !name.is_empty()),
            tunnel,
        })
    }
}

fn required_text(value: &Option<String>, field: &'static str) -> Result<String> {
    match value {
        Some(text) if !text.trim().is_empty() => Ok(text.clone()),
        _ => Err(FoilError::IncompleteDescriptor { field }),
    }
}

fn required_port(value: Option<i64>, field: &'static str) -> Result<u16> {
    let port = value.ok_or(FoilError::IncompleteDescriptor { field })?;
    u16::try_from(port)
        .ok()
        .filter(|port| *port != 0)
        .ok_or_else(|| FoilError::InvalidDescriptor {
            field,
            reason: format!("{} is outside 1-65535", port),
        })
}

/// SSH tunnel parameters of a validated descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TunnelDescriptor {
    /// SSH server host
    pub host: String,
    /// SSH server port
    pub port: u16,
    pub username: String,
    pub private_key_path: PathBuf,
    /// Database port on the SSH server's loopback interface
    pub remote_port: u16,
}

/// Fully validated connection parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionDescriptor {
    pub address: String,
    pub port: u16,
    pub timeout_ms: u64,
    pub database_name: Option<String>,
    /// Present exactly when the connection goes through an SSH tunnel
    pub tunnel: Option<TunnelDescriptor>,
}

impl ConnectionDescriptor {
    pub fn use_tunnel(&self) -> bool {
        self.tunnel.is_some()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Tunnel request for this descriptor.
    ///
    /// The tunnel listens on `0.0.0.0:<port>` locally and forwards to
    /// `127.0.0.1:<remote_port>` on the SSH server, so the driver keeps
    /// connecting to `address:port` unchanged.
    pub fn tunnel_config(&self) -> Option<SshTunnelConfig> {
        self.tunnel.as_ref().map(|tunnel| {
            SshTunnelConfig::new(
                tunnel.host.clone(),
                tunnel.username.clone(),
                tunnel.private_key_path.clone(),
            )
            .port(tunnel.port)
            .bind(TUNNEL_BIND_HOST, self.port)
            .forward_to(TUNNEL_FORWARD_HOST, tunnel.remote_port)
        })
    }

    /// What the database driver connects to
    pub fn driver_target(&self) -> DriverTarget {
        DriverTarget {
            address: self.address.clone(),
            port: self.port,
            timeout: self.timeout(),
            database: self.database_name.clone(),
        }
    }
}

#[cfg(test)]
mod tests;
