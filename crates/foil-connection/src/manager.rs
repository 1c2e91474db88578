//! Connection manager for a single database connection

use foil_core::{
    ConnectionDescriptor, DatabaseClient, DatabaseDriver, FoilError, PartialDescriptor, Result,
    Tunnel, TunnelOpener,
};
use foil_drivers::SshTunnelOpener;
use foil_drivers::mongodb::MongoDbDriver;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a [`ConnectionManager`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
        }
    }
}

/// Manages one database connection and the SSH tunnel it may need
///
/// `connect` opens the tunnel (when the descriptor asks for one), creates a
/// client and probes the server once. Anything opened by a failed attempt
/// is closed again before the error is returned. Dropping the manager
/// disconnects it.
pub struct ConnectionManager<D: DatabaseDriver, T: TunnelOpener> {
    driver: D,
    tunnel_opener: T,
    state: ConnectionState,
    client: Option<D::Client>,
    tunnel: Option<T::Tunnel>,
    descriptor: Option<ConnectionDescriptor>,
}

/// Manager over the bundled MongoDB driver and ssh2 tunnel
pub type MongoConnectionManager = ConnectionManager<MongoDbDriver, SshTunnelOpener>;

impl MongoConnectionManager {
    /// Create a manager that connects to MongoDB, tunnelling over ssh2 when asked
    pub fn mongodb() -> Self {
        Self::new(MongoDbDriver::new(), SshTunnelOpener::new())
    }
}

impl<D: DatabaseDriver, T: TunnelOpener> ConnectionManager<D, T> {
    /// Create a new, disconnected manager
    pub fn new(driver: D, tunnel_opener: T) -> Self {
        Self {
            driver,
            tunnel_opener,
            state: ConnectionState::Disconnected,
            client: None,
            tunnel: None,
            descriptor: None,
        }
    }

    /// Validate `partial` and connect with the result
    pub fn connect_partial(&mut self, partial: &PartialDescriptor) -> Result<()> {
        self.ensure_disconnected()?;
        let descriptor = partial.validate()?;
        self.connect(&descriptor)
    }

    /// Connect using `descriptor`.
    ///
    /// Fails with `AlreadyConnected` unless the manager is disconnected.
    /// The liveness probe is a single attempt bounded by the descriptor's
    /// timeout.
    #[tracing::instrument(
        skip(self, descriptor),
        fields(
            driver = self.driver.name(),
            address = %descriptor.address,
            port = descriptor.port,
            use_tunnel = descriptor.use_tunnel()
        )
    )]
    pub fn connect(&mut self, descriptor: &ConnectionDescriptor) -> Result<()> {
        self.ensure_disconnected()?;
        tracing::info!("connecting");

        self.state = ConnectionState::Connecting;
        match self.open(descriptor) {
            Ok((client, tunnel)) => {
                self.client = Some(client);
                self.tunnel = tunnel;
                self.descriptor = Some(descriptor.clone());
                self.state = ConnectionState::Connected;
                tracing::info!(local_tunnel_port = ?self.local_tunnel_port(), "connection established");
                Ok(())
            }
            Err(e) => {
                self.state = ConnectionState::Disconnected;
                tracing::error!(error = %e, "failed to connect");
                Err(e)
            }
        }
    }

    /// Close the client, then the tunnel.
    ///
    /// Safe to call in any state. Close errors are logged, not returned.
    #[tracing::instrument(skip(self), fields(state = %self.state))]
    pub fn disconnect(&mut self) {
        if let Some(client) = self.client.take() {
            tracing::info!("disconnecting");
            close_client(client);
        }
        if let Some(tunnel) = self.tunnel.take() {
            close_tunnel(tunnel);
        }
        self.descriptor = None;
        self.state = ConnectionState::Disconnected;
    }

    /// The connected client, if any
    pub fn client(&self) -> Option<&D::Client> {
        self.client.as_ref()
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Local port of the open tunnel, if the connection uses one
    pub fn local_tunnel_port(&self) -> Option<u16> {
        self.tunnel.as_ref().map(Tunnel::local_port)
    }

    /// Descriptor of the current connection
    pub fn descriptor(&self) -> Option<&ConnectionDescriptor> {
        self.descriptor.as_ref()
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    fn ensure_disconnected(&self) -> Result<()> {
        if self.state != ConnectionState::Disconnected {
            tracing::warn!(state = %self.state, "connect called while not disconnected");
            return Err(FoilError::AlreadyConnected);
        }
        Ok(())
    }

    fn open(&self, descriptor: &ConnectionDescriptor) -> Result<(D::Client, Option<T::Tunnel>)> {
        let tunnel = match descriptor.tunnel_config() {
            Some(config) => {
                tracing::debug!(
                    ssh_host = %config.host,
                    ssh_port = config.port,
                    forward_port = config.forward_port,
                    "opening SSH tunnel"
                );
                let tunnel = self
                    .tunnel_opener
                    .open_tunnel(&config)
                    .map_err(|e| match e {
                        FoilError::Tunnel(_) => e,
                        other => FoilError::Tunnel(other.to_string()),
                    })?;
                Some(tunnel)
            }
            None => None,
        };

        let client = match self.driver.connect(&descriptor.driver_target()) {
            Ok(client) => client,
            Err(e) => {
                if let Some(tunnel) = tunnel {
                    close_tunnel(tunnel);
                }
                return Err(e);
            }
        };

        if let Err(e) = client.ping(descriptor.timeout()) {
            close_client(client);
            if let Some(tunnel) = tunnel {
                close_tunnel(tunnel);
            }
            return Err(e);
        }

        Ok((client, tunnel))
    }
}

impl<D: DatabaseDriver, T: TunnelOpener> Drop for ConnectionManager<D, T> {
    fn drop(&mut self) {
        if self.client.is_some() || self.tunnel.is_some() {
            self.disconnect();
        }
    }
}

fn close_client<C: DatabaseClient>(client: C) {
    if let Err(e) = client.close() {
        tracing::warn!(error = %e, "error closing database client");
    }
}

fn close_tunnel<U: Tunnel>(tunnel: U) {
    let local_port = tunnel.local_port();
    if let Err(e) = tunnel.close() {
        tracing::warn!(local_port, error = %e, "error closing SSH tunnel");
    }
}
