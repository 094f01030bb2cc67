//! JavaScript Engine
//!
//! Manages the Boa JavaScript runtime with a dedicated worker thread
//! and proper event loop integration.

use boa_engine::{Context, Source};
use std::sync::mpsc::Receiver;
use std::thread::{self, JoinHandle};

use crate::js::builder::build_context;
use crate::js::{JsEngineClient, JsEngineExtension};

/// Commands that can be sent to the JS engine thread.
#[derive(Debug)]
pub enum JsCommand {
    /// Execute a JS script (non-module).
    Execute { source: String },
    /// Tick the event loop (run pending jobs).
    Tick,
    /// Shutdown the JS engine.
    Shutdown,
}

/// JavaScript engine with dedicated worker thread.
///
/// Dropping the engine asks the thread to stop.
pub struct JsEngine {
    client: JsEngineClient,
    handle: Option<JoinHandle<()>>,
}

impl JsEngine {
    pub(crate) fn spawn(
        client: JsEngineClient,
        receiver: Receiver<JsCommand>,
        extensions: Vec<Box<dyn JsEngineExtension>>,
    ) -> Self {
        // Clone client for the JS thread (extensions push events through it)
        let client_for_thread = client.clone();

        let handle = thread::spawn(move || {
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                run_js_loop(&receiver, &extensions, client_for_thread);
            }));

            if let Err(e) = result {
                log::error!("JS engine panicked: {:?}", e);
            }

            for extension in &extensions {
                extension.shutdown();
            }
        });

        Self {
            client,
            handle: Some(handle),
        }
    }

    /// Get a client handle for communicating with the engine.
    pub fn client(&self) -> JsEngineClient {
        self.client.clone()
    }

    /// Stop the engine and wait for its thread to exit.
    pub fn shutdown(mut self) {
        self.client.shutdown();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("JS engine thread could not be joined");
            }
        }
    }
}

impl Drop for JsEngine {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.client.shutdown();
        }
    }
}

/// Main loop for the JS engine thread.
fn run_js_loop(
    receiver: &Receiver<JsCommand>,
    extensions: &[Box<dyn JsEngineExtension>],
    client: JsEngineClient,
) {
    log::info!("JS engine thread started");

    let mut context = match build_context(extensions, &client) {
        Ok(context) => context,
        Err(e) => {
            log::error!("Failed to initialize JS runtime: {}", e);
            return;
        }
    };

    log::info!("JS runtime initialized");

    // Process commands
    loop {
        match receiver.recv() {
            Ok(JsCommand::Execute { source }) => {
                log::debug!("Executing script ({} bytes)...", source.len());

                let source = Source::from_bytes(source.as_bytes());

                if let Err(e) = context.eval(source) {
                    log::error!("Failed to execute script: {}", e);
                }

                flush_event_loop(&mut context);
            }
            Ok(JsCommand::Tick) => {
                flush_event_loop(&mut context);
            }
            Ok(JsCommand::Shutdown) => {
                log::info!("JS engine shutting down");
                break;
            }
            Err(e) => {
                log::debug!("JS engine channel closed: {}", e);
                break;
            }
        }
    }

    log::info!("JS engine thread stopped");
}

/// Flush the event loop: run microtasks (promise jobs) queued by the last command.
fn flush_event_loop(context: &mut Context) {
    if let Err(e) = context.run_jobs() {
        log::error!("Error running Boa jobs: {}", e);
    }
}
