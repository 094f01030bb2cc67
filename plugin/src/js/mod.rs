//! JavaScript Engine Module
//!
//! A Boa JS engine on its own thread, driven through a command channel.
//! No Bevy dependencies - this can be used standalone.
//!
//! Extensions add the script surface: a browser-style `WebSocket` class and
//! the `wsPing` promise API built on top of it.

mod builder;
mod client;
mod engine;
mod ping;
mod websocket;

pub use builder::{JsEngineBuilder, JsEngineExtension};
pub use client::JsEngineClient;
pub use engine::{JsCommand, JsEngine};
pub use ping::{PingExtension, ScriptBackend, ScriptHandle, start_script_engine};
pub use websocket::WebSocketExtension;
