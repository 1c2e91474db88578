//! MongoDB driver implementation

use crate::block_on_tokio;
use bson::{Document, doc};
use foil_core::{DatabaseClient, DatabaseDriver, DriverTarget, FoilError, Result};
use mongodb::error::ErrorKind as MongoErrorKind;
use mongodb::{Client, Database, options::ClientOptions};
use std::time::Duration;

/// Default MongoDB port
pub const DEFAULT_MONGODB_PORT: u16 = 27017;

/// MongoDB database driver
pub struct MongoDbDriver;

impl MongoDbDriver {
    /// Create a new MongoDB driver instance
    pub fn new() -> Self {
        tracing::debug!("MongoDB driver initialized");
        Self
    }

    /// Connection string for `target`.
    ///
    /// Server selection and socket connect are both bounded by the target
    /// timeout.
    pub fn build_connection_string(&self, target: &DriverTarget) -> String {
        let timeout_ms = target.timeout.as_millis();
        let mut conn_str = format!("mongodb://{}:{}/", target.address, target.port);
        if let Some(database) = target.database.as_deref().filter(|d| !d.is_empty()) {
            conn_str.push_str(database);
        }
        conn_str.push_str(&format!(
            "?serverSelectionTimeoutMS={}&connectTimeoutMS={}",
            timeout_ms, timeout_ms
        ));
        conn_str
    }
}

impl Default for MongoDbDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl DatabaseDriver for MongoDbDriver {
    type Client = MongoDbClient;

    fn name(&self) -> &'static str {
        "mongodb"
    }

    #[tracing::instrument(skip(self, target), fields(address = %target.address, port = target.port))]
    fn connect(&self, target: &DriverTarget) -> Result<MongoDbClient> {
        tracing::debug!("creating MongoDB client");

        let connection_string = self.build_connection_string(target);
        let client = block_on_tokio(async {
            let options = ClientOptions::parse(&connection_string)
                .await
                .map_err(|e| FoilError::Driver(format!("Failed to parse MongoDB options: {}", e)))?;
            Client::with_options(options)
                .map_err(|e| FoilError::Driver(format!("Failed to create MongoDB client: {}", e)))
        })?;

        Ok(MongoDbClient::new(client, target.clone()))
    }
}

/// MongoDB client handle
///
/// The underlying client connects lazily; [`DatabaseClient::ping`] is the
/// first call that talks to the server.
#[derive(Debug)]
pub struct MongoDbClient {
    client: Client,
    target: DriverTarget,
}

impl MongoDbClient {
    pub fn new(client: Client, target: DriverTarget) -> Self {
        Self { client, target }
    }

    /// The underlying driver client
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Handle to the configured database, if one was set
    pub fn database(&self) -> Option<Database> {
        self.target
            .database
            .as_deref()
            .filter(|name| !name.is_empty())
            .map(|name| self.client.database(name))
    }

    pub fn target(&self) -> &DriverTarget {
        &self.target
    }

    /// Run `buildInfo` against the admin database, bounded by `timeout`
    pub fn server_info(&self, timeout: Duration) -> Result<Document> {
        let admin = self.client.database("admin");
        let probe = async {
            tokio::time::timeout(timeout, admin.run_command(doc! { "buildInfo": 1 })).await
        };

        match block_on_tokio(probe) {
            Ok(Ok(info)) => Ok(info),
            Ok(Err(e)) => Err(self.map_error(e, timeout)),
            Err(_) => Err(self.timeout_error(timeout, "no response to buildInfo".to_string())),
        }
    }

    fn map_error(&self, error: mongodb::error::Error, timeout: Duration) -> FoilError {
        if matches!(*error.kind, MongoErrorKind::ServerSelection { .. }) {
            self.timeout_error(timeout, error.to_string())
        } else {
            FoilError::Driver(format!("MongoDB command failed: {}", error))
        }
    }

    fn timeout_error(&self, timeout: Duration, message: String) -> FoilError {
        FoilError::DriverTimeout {
            address: self.target.address.clone(),
            port: self.target.port,
            timeout_ms: timeout.as_millis() as u64,
            message,
        }
    }
}

impl DatabaseClient for MongoDbClient {
    #[tracing::instrument(skip(self), fields(address = %self.target.address, port = self.target.port))]
    fn ping(&self, timeout: Duration) -> Result<()> {
        let info = self.server_info(timeout)?;
        tracing::debug!(
            version = info.get_str("version").unwrap_or("unknown"),
            "MongoDB server responded"
        );
        Ok(())
    }

    fn close(self) -> Result<()> {
        tracing::debug!(address = %self.target.address, port = self.target.port, "closing MongoDB client");
        block_on_tokio(async move { self.client.shutdown().await });
        Ok(())
    }
}
