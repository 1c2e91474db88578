//! SSH Tunnel Support
//!
//! Local port forwarding over an ssh2 session. The tunnel listens on the
//! configured local address and opens a `direct-tcpip` channel to the
//! forward target for every accepted connection.

use foil_core::{FoilError, SshTunnelConfig, Tunnel, TunnelOpener};
use ssh2::{Channel, Session};
use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Error types for SSH tunnel operations
#[derive(Debug, thiserror::Error)]
pub enum SshTunnelError {
    /// SSH server hostname did not resolve
    #[error("Failed to resolve SSH server {host}:{port}: {source}")]
    ResolveFailed {
        host: String,
        port: u16,
        source: std::io::Error,
    },

    /// Failed to connect to SSH server
    #[error("Failed to connect to SSH server {host}:{port}: {source}")]
    ConnectionFailed {
        host: String,
        port: u16,
        source: std::io::Error,
    },

    /// SSH handshake failed
    #[error("SSH handshake failed: {0}")]
    HandshakeFailed(String),

    /// Authentication failed
    #[error("SSH authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Private key file not found
    #[error("Private key file not found: {path}")]
    PrivateKeyNotFound { path: String },

    /// Local listen address could not be bound
    #[error("Failed to bind local address {address}: {source}")]
    BindFailed {
        address: String,
        source: std::io::Error,
    },

    /// Failed to establish port forwarding
    #[error("Failed to establish port forwarding: {0}")]
    PortForwardingFailed(String),

    #[error("SSH session disconnect failed: {0}")]
    DisconnectFailed(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<SshTunnelError> for FoilError {
    fn from(error: SshTunnelError) -> Self {
        FoilError::Tunnel(error.to_string())
    }
}

type TunnelResult<T> = std::result::Result<T, SshTunnelError>;

/// An SSH tunnel forwarding a local port to a target behind the SSH server
///
/// Closing or dropping the tunnel stops the forwarding thread and
/// disconnects the session.
///
/// # Example
///
/// ```ignore
/// use foil_core::SshTunnelConfig;
/// use foil_drivers::SshTunnel;
///
/// let config = SshTunnelConfig::new("bastion.example.com", "deploy", "/home/deploy/.ssh/id_rsa")
///     .bind("0.0.0.0", 27017)
///     .forward_to("127.0.0.1", 27017);
/// let tunnel = SshTunnel::open(&config)?;
/// ```
pub struct SshTunnel {
    session: Session,
    local_port: u16,
    forward_host: String,
    forward_port: u16,
    is_running: Arc<AtomicBool>,
    forward_thread: Option<thread::JoinHandle<()>>,
    closed: bool,
}

impl std::fmt::Debug for SshTunnel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SshTunnel")
            .field("local_port", &self.local_port)
            .field("forward_host", &self.forward_host)
            .field("forward_port", &self.forward_port)
            .field("is_running", &self.is_running.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl SshTunnel {
    /// Open a tunnel and start forwarding.
    ///
    /// The local listener is bound before the SSH server is contacted. TCP
    /// connect, handshake and authentication are each bounded by
    /// `config.timeout_seconds`.
    pub fn open(config: &SshTunnelConfig) -> foil_core::Result<Self> {
        config.validate()?;

        info!(
            ssh_host = %config.host,
            ssh_port = config.port,
            bind = %format!("{}:{}", config.bind_host, config.bind_port),
            forward = %format!("{}:{}", config.forward_host, config.forward_port),
            "Establishing SSH tunnel"
        );

        check_private_key(&config.private_key_path)?;

        let listener = bind_listener(&config.bind_host, config.bind_port)?;
        let local_port = listener.local_addr().map_err(SshTunnelError::from)?.port();

        let session = open_session(config)?;

        let is_running = Arc::new(AtomicBool::new(true));
        let forward_thread = start_forwarding_thread(
            session.clone(),
            listener,
            config.forward_host.clone(),
            config.forward_port,
            Duration::from_secs(config.timeout_seconds as u64),
            is_running.clone(),
        );

        info!(
            local_port = local_port,
            forward = %format!("{}:{}", config.forward_host, config.forward_port),
            "SSH tunnel established"
        );

        Ok(Self {
            session,
            local_port,
            forward_host: config.forward_host.clone(),
            forward_port: config.forward_port,
            is_running,
            forward_thread: Some(forward_thread),
            closed: false,
        })
    }

    /// Get the forward target host
    pub fn forward_host(&self) -> &str {
        &self.forward_host
    }

    /// Get the forward target port
    pub fn forward_port(&self) -> u16 {
        self.forward_port
    }

    /// Check if the tunnel is still active
    pub fn is_active(&self) -> bool {
        self.is_running.load(Ordering::SeqCst)
    }

    fn shutdown(&mut self) -> TunnelResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        info!(local_port = self.local_port, "Closing SSH tunnel");

        self.is_running.store(false, Ordering::SeqCst);

        if let Some(handle) = self.forward_thread.take() {
            if handle.join().is_err() {
                warn!("SSH forwarding thread panicked");
            }
        }

        self.session.set_blocking(true);
        self.session
            .disconnect(None, "Tunnel closed", None)
            .map_err(|e| SshTunnelError::DisconnectFailed(e.to_string()))?;

        debug!("SSH tunnel closed");
        Ok(())
    }
}

impl Tunnel for SshTunnel {
    fn local_port(&self) -> u16 {
        self.local_port
    }

    fn close(mut self) -> foil_core::Result<()> {
        Ok(self.shutdown()?)
    }
}

impl Drop for SshTunnel {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            warn!("Error closing SSH tunnel: {}", e);
        }
    }
}

/// Opens [`SshTunnel`]s for the connection manager
#[derive(Debug, Default, Clone, Copy)]
pub struct SshTunnelOpener;

impl SshTunnelOpener {
    pub fn new() -> Self {
        Self
    }
}

impl TunnelOpener for SshTunnelOpener {
    type Tunnel = SshTunnel;

    fn open_tunnel(&self, config: &SshTunnelConfig) -> foil_core::Result<SshTunnel> {
        SshTunnel::open(config)
    }
}

fn check_private_key(path: &Path) -> TunnelResult<()> {
    if !path.is_file() {
        return Err(SshTunnelError::PrivateKeyNotFound {
            path: path.display().to_string(),
        });
    }
    Ok(())
}

fn bind_listener(host: &str, port: u16) -> TunnelResult<TcpListener> {
    let listener =
        TcpListener::bind((host, port)).map_err(|e| SshTunnelError::BindFailed {
            address: format!("{}:{}", host, port),
            source: e,
        })?;
    listener.set_nonblocking(true)?;
    Ok(listener)
}

/// Connect, handshake and authenticate with the configured private key
fn open_session(config: &SshTunnelConfig) -> TunnelResult<Session> {
    let timeout = Duration::from_secs(config.timeout_seconds as u64);
    let tcp = connect_tcp(&config.host, config.port, timeout)?;

    tcp.set_read_timeout(Some(timeout))?;
    tcp.set_write_timeout(Some(timeout))?;

    let mut session = Session::new().map_err(|e| SshTunnelError::HandshakeFailed(e.to_string()))?;
    session.set_timeout(config.timeout_seconds.saturating_mul(1000));
    session.set_tcp_stream(tcp);
    session
        .handshake()
        .map_err(|e| SshTunnelError::HandshakeFailed(e.to_string()))?;

    debug!(path = %config.private_key_path.display(), "Authenticating with private key");
    session
        .userauth_pubkey_file(&config.username, None, &config.private_key_path, None)
        .map_err(|e| SshTunnelError::AuthenticationFailed(e.to_string()))?;

    if !session.authenticated() {
        return Err(SshTunnelError::AuthenticationFailed(
            "Authentication not confirmed".to_string(),
        ));
    }
    debug!("SSH authentication successful");

    if config.keepalive_seconds > 0 {
        session.set_keepalive(true, config.keepalive_seconds);
    }
    // Forwarded channels poll; the handshake timeout must not apply to them
    session.set_timeout(0);

    Ok(session)
}

fn connect_tcp(host: &str, port: u16, timeout: Duration) -> TunnelResult<TcpStream> {
    let addrs: Vec<SocketAddr> = (host, port)
        .to_socket_addrs()
        .map_err(|e| SshTunnelError::ResolveFailed {
            host: host.to_string(),
            port,
            source: e,
        })?
        .collect();

    let mut last_error = std::io::Error::new(
        std::io::ErrorKind::NotFound,
        "host resolved to no addresses",
    );
    for addr in addrs {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                debug!(%addr, error = %e, "SSH server address unreachable");
                last_error = e;
            }
        }
    }

    Err(SshTunnelError::ConnectionFailed {
        host: host.to_string(),
        port,
        source: last_error,
    })
}

/// Start the port forwarding thread.
///
/// One thread accepts local connections and pumps every forwarded channel.
/// The session stays non-blocking for as long as the thread runs, so no
/// channel operation can stall or starve another.
fn start_forwarding_thread(
    session: Session,
    listener: TcpListener,
    forward_host: String,
    forward_port: u16,
    open_timeout: Duration,
    is_running: Arc<AtomicBool>,
) -> thread::JoinHandle<()> {
    session.set_blocking(false);

    thread::spawn(move || {
        let mut forwards: Vec<Forward<Channel>> = Vec::new();

        while is_running.load(Ordering::SeqCst) {
            let mut active = false;

            match listener.accept() {
                Ok((local_stream, peer)) => {
                    debug!(%peer, "Accepted tunnel connection");
                    active = true;
                    let opened = open_channel(
                        &session,
                        &forward_host,
                        forward_port,
                        open_timeout,
                        &is_running,
                    )
                    .and_then(|channel| Ok(Forward::new(local_stream, channel)?));
                    match opened {
                        Ok(forward) => forwards.push(forward),
                        Err(e) => warn!(%peer, error = %e, "Could not forward tunnel connection"),
                    }
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => {}
                Err(e) => {
                    error!("Error accepting tunnel connection: {}", e);
                    break;
                }
            }

            forwards.retain_mut(|forward| match forward.pump() {
                Ok(PumpStatus::Active) => {
                    active = true;
                    true
                }
                Ok(PumpStatus::Idle) => true,
                Ok(PumpStatus::Finished) => {
                    forward.channel.hang_up();
                    false
                }
                Err(e) => {
                    debug!(error = %e, "Forwarded connection failed");
                    forward.channel.hang_up();
                    false
                }
            });

            if !active {
                thread::sleep(Duration::from_millis(1));
            }
        }

        for mut forward in forwards {
            forward.channel.hang_up();
        }
        debug!("Port forwarding thread exiting");
    })
}

/// Open a `direct-tcpip` channel on a non-blocking session
fn open_channel(
    session: &Session,
    forward_host: &str,
    forward_port: u16,
    timeout: Duration,
    is_running: &AtomicBool,
) -> TunnelResult<Channel> {
    let deadline = Instant::now() + timeout;
    loop {
        match session.channel_direct_tcpip(forward_host, forward_port, None) {
            Ok(channel) => return Ok(channel),
            Err(e) => {
                let e = io::Error::from(e);
                if e.kind() != io::ErrorKind::WouldBlock {
                    return Err(SshTunnelError::PortForwardingFailed(e.to_string()));
                }
            }
        }
        if !is_running.load(Ordering::SeqCst) || Instant::now() >= deadline {
            return Err(SshTunnelError::PortForwardingFailed(format!(
                "no channel to {}:{} within {}s",
                forward_host,
                forward_port,
                timeout.as_secs()
            )));
        }
        thread::sleep(Duration::from_millis(1));
    }
}

/// The remote end of a forwarded connection
trait ChannelIo: Read + Write {
    /// Remote side has sent EOF
    fn at_eof(&self) -> bool;

    /// Best-effort EOF and close. Never blocks.
    fn hang_up(&mut self);
}

impl ChannelIo for Channel {
    fn at_eof(&self) -> bool {
        self.eof()
    }

    fn hang_up(&mut self) {
        let _ = self.send_eof();
        let _ = self.close();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PumpStatus {
    Idle,
    Active,
    Finished,
}

/// One local connection and its channel.
///
/// Bytes that could not be written yet stay buffered until the next pump, so
/// `WouldBlock` on either side never drops data.
struct Forward<C> {
    local: TcpStream,
    channel: C,
    to_channel: Vec<u8>,
    to_local: Vec<u8>,
    local_closed: bool,
    remote_closed: bool,
}

impl<C: ChannelIo> Forward<C> {
    fn new(local: TcpStream, channel: C) -> io::Result<Self> {
        local.set_nonblocking(true)?;
        Ok(Self {
            local,
            channel,
            to_channel: Vec::new(),
            to_local: Vec::new(),
            local_closed: false,
            remote_closed: false,
        })
    }

    /// Move whatever is ready in both directions without blocking
    fn pump(&mut self) -> io::Result<PumpStatus> {
        let mut buf = [0u8; 8192];
        let mut active = false;

        if self.to_channel.is_empty() && !self.local_closed {
            match self.local.read(&mut buf) {
                Ok(0) => self.local_closed = true,
                Ok(n) => {
                    self.to_channel.extend_from_slice(&buf[..n]);
                    active = true;
                }
                Err(e) if retryable(&e) => {}
                Err(e) => return Err(e),
            }
        }
        active |= flush_pending(&mut self.to_channel, &mut self.channel)?;

        if self.to_local.is_empty() && !self.remote_closed {
            match self.channel.read(&mut buf) {
                Ok(0) => self.remote_closed = self.channel.at_eof(),
                Ok(n) => {
                    self.to_local.extend_from_slice(&buf[..n]);
                    active = true;
                }
                Err(e) if retryable(&e) => {}
                Err(e) => return Err(e),
            }
        }
        active |= flush_pending(&mut self.to_local, &mut self.local)?;

        let finished = (self.local_closed && self.to_channel.is_empty())
            || (self.remote_closed && self.to_local.is_empty());
        Ok(if finished {
            PumpStatus::Finished
        } else if active {
            PumpStatus::Active
        } else {
            PumpStatus::Idle
        })
    }
}

/// Write as much of `pending` as `sink` accepts; true if anything moved
fn flush_pending(pending: &mut Vec<u8>, sink: &mut impl Write) -> io::Result<bool> {
    if pending.is_empty() {
        return Ok(false);
    }
    match sink.write(pending) {
        Ok(0) => Err(io::Error::new(
            io::ErrorKind::WriteZero,
            "forwarded peer stopped accepting data",
        )),
        Ok(n) => {
            pending.drain(..n);
            Ok(true)
        }
        Err(e) if retryable(&e) => Ok(false),
        Err(e) => Err(e),
    }
}

fn retryable(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
    )
}
