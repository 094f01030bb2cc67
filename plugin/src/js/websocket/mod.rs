//! Browser-style `WebSocket` for scripts.
//!
//! Connections live on the shared Tokio runtime. Their open, message, error
//! and close events are queued back into the engine as `__ws_dispatch_event`
//! calls.

mod extension;
mod manager;

pub use extension::WebSocketExtension;
pub(crate) use manager::NON_TEXT_ERROR;
