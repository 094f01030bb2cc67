//! Ping UI
//!
//! A button and a result panel mounted into a host entity. Pressing the button
//! runs one exchange in the background; the panel shows the reply or the error.

mod plugin;
mod style;
mod systems;
mod types;

pub use plugin::PingUiPlugin;
pub use systems::*;
pub use types::*;

#[cfg(test)]
mod tests;
