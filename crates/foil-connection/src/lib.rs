//! Foil Connection - connection lifecycle
//!
//! This crate opens the optional SSH tunnel and the database client for a
//! resolved connection descriptor and tears both down again.

mod manager;

pub use manager::{ConnectionManager, ConnectionState, MongoConnectionManager};
