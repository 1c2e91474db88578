//! Foil Core - configuration and connection-parameter resolution
//!
//! This crate holds everything that does not touch the network:
//!
//! - `ConfigMap` / `ConfigStore` - INI config files as section -> option -> string
//! - `PartialDescriptor` / `ConnectionDescriptor` - connection parameters before
//!   and after validation
//! - `merge` / `resolve` - turning a config file, overrides and defaults into a
//!   descriptor
//! - `DatabaseDriver`, `DatabaseClient`, `TunnelOpener`, `Tunnel` - the seams the
//!   driver and tunnel implementations plug into

mod config_store;
mod connection;
mod descriptor;
mod driver;
mod error;
mod resolver;
pub mod security;

pub use config_store::*;
pub use connection::*;
pub use descriptor::*;
pub use driver::*;
pub use error::*;
pub use resolver::*;
pub use security::*;
