//! Client handle returned by a database driver

use crate::Result;
use std::time::Duration;

/// A connected database client
pub trait DatabaseClient: Send {
    /// Single liveness probe, bounded by `timeout`.
    ///
    /// Fails with `FoilError::DriverTimeout` when the server does not answer
    /// in time. Never retries.
    fn ping(&self, timeout: Duration) -> Result<()>;

    /// Release the client and any sockets it holds
    fn close(self) -> Result<()>;
}
