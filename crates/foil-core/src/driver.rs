//! Database driver trait definition

use crate::{DatabaseClient, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Where and how a driver should connect
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverTarget {
    pub address: String,
    pub port: u16,
    /// Bound on server selection and on the liveness probe
    pub timeout: Duration,
    /// Database the client should default to, if any
    pub database: Option<String>,
}

impl fmt::Display for DriverTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.address, self.port)
    }
}

/// A database driver
pub trait DatabaseDriver {
    type Client: DatabaseClient;

    /// Driver name (e.g., "mongodb")
    fn name(&self) -> &'static str;

    /// Create a client for `target`.
    ///
    /// Drivers may connect lazily; reachability is established by
    /// [`DatabaseClient::ping`].
    fn connect(&self, target: &DriverTarget) -> Result<Self::Client>;
}
