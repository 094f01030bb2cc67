//! Shared Tokio runtime for background socket work.
//!
//! Bevy systems and the script engine thread have no runtime of their own, so
//! exchanges and script-side sockets are spawned here.

use tokio::runtime::{Handle, Runtime};

pub(crate) static TOKIO: once_cell::sync::Lazy<Runtime> = once_cell::sync::Lazy::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .worker_threads(2)
        .thread_name("ws-ping")
        .build()
        .expect("Failed to build Tokio runtime")
});

/// Handle to the shared runtime.
pub(crate) fn handle() -> Handle {
    TOKIO.handle().clone()
}
