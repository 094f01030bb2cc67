use std::sync::mpsc;

use crate::js::JsCommand;

/// Client handle for communicating with the JS engine thread.
#[derive(Clone)]
pub struct JsEngineClient {
    pub(crate) sender: mpsc::Sender<JsCommand>,
}

impl JsEngineClient {
    /// Send a tick command to flush the JS event loop.
    pub fn tick(&self) {
        if let Err(e) = self.sender.send(JsCommand::Tick) {
            log::trace!("Failed to send tick command: {}", e);
        }
    }

    /// Execute a script.
    pub fn execute(&self, source: impl Into<String>) {
        if let Err(e) = self.sender.send(JsCommand::Execute {
            source: source.into(),
        }) {
            log::error!("Failed to send execute command: {}", e);
        }
    }

    /// Shutdown the JS engine.
    pub fn shutdown(&self) {
        let _ = self.sender.send(JsCommand::Shutdown);
    }
}
