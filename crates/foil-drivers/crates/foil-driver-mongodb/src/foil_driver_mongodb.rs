//! MongoDB driver for foil
//!
//! Implements the `DatabaseDriver` and `DatabaseClient` seams from
//! `foil-core` on top of the official async `mongodb` crate, driven from
//! synchronous code through a shared Tokio runtime.
//!
//! # Example
//!
//! ```ignore
//! use foil_driver_mongodb::MongoDbDriver;
//! use foil_core::{DatabaseClient, DatabaseDriver};
//!
//! let driver = MongoDbDriver::new();
//! let client = driver.connect(&descriptor.driver_target())?;
//! client.ping(descriptor.timeout())?;
//! ```

mod driver;
#[cfg(test)]
mod driver_tests;
mod runtime;

pub use driver::*;
pub use runtime::{block_on_tokio, get_tokio_runtime};

pub use bson;
pub use mongodb;
