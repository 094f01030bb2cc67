//! WebSocket ping for Bevy UI.
//!
//! [`PingUiPlugin`] mounts a button into a [`PingUiHost`] entity. Each press
//! opens a connection, sends one message, shows the first reply and closes the
//! connection again. The exchange itself is also usable on its own through
//! [`ping`], and from scripts through the embedded engine's `wsPing`.

pub mod config;
pub mod js;
pub mod js_bevy;
pub mod ping;
mod runtime;
pub mod ui;

pub use config::{BackendKind, ConfigError, PingConfig};
pub use js::{ScriptBackend, start_script_engine};
pub use js_bevy::{JsClientResource, JsPlugin};
pub use ping::{
    Endpoint, ExchangeOutcome, NativeBackend, PingBackend, PingClient, PingError, PingReport,
    PingReportReceiver, PingRequest, ping, ping_with_timeout,
};
pub use ui::{PingDisplay, PingInFlight, PingUiHost, PingUiPlugin};
