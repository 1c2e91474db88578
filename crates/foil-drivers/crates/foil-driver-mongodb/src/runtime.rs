//! Tokio runtime for the async MongoDB driver
//!
//! The public API is synchronous, so driver calls are run to completion on
//! a shared Tokio runtime.

use std::sync::OnceLock;
use tokio::runtime::Runtime;

/// Global Tokio runtime for database drivers
static TOKIO_RUNTIME: OnceLock<Runtime> = OnceLock::new();

/// Get or create the shared Tokio runtime.
///
/// # Panics
///
/// Panics if the runtime cannot be created.
pub fn get_tokio_runtime() -> &'static Runtime {
    TOKIO_RUNTIME.get_or_init(|| {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .thread_name("foil-driver-runtime")
            .build()
            .expect("Failed to create Tokio runtime for database drivers")
    })
}

/// Run a future to completion on the shared Tokio runtime.
///
/// Blocks the current thread. Must not be called from inside the runtime.
pub fn block_on_tokio<F, T>(future: F) -> T
where
    F: std::future::Future<Output = T>,
{
    get_tokio_runtime().block_on(future)
}
