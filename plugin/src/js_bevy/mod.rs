//! Bevy glue for the script engine.
//!
//! Used when the ping UI runs on the script backend: the app owns the engine
//! and ticks its job queue once per frame.

mod plugin;

pub use plugin::{JsClientResource, JsPlugin};
