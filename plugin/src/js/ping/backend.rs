use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use serde_json::Value;

use crate::js::JsEngineClient;
use crate::js::ping::{PendingExchanges, ScriptFailure, ScriptHandle};
use crate::ping::{Deadline, PingBackend, PingError, PingRequest};

/// Runs exchanges through the `wsPing` shim inside a script engine.
#[derive(Clone)]
pub struct ScriptBackend {
    client: JsEngineClient,
    handle: ScriptHandle,
}

impl ScriptBackend {
    pub fn new(client: JsEngineClient, handle: ScriptHandle) -> Self {
        Self { client, handle }
    }

    /// Resolves once the engine has registered the ping API.
    ///
    /// Fails if the engine stopped (or never started) first.
    pub async fn initialized(&self) -> Result<(), PingError> {
        let mut ready = self.handle.ready.clone();
        ready
            .wait_for(|ready| *ready)
            .await
            .map(|_| ())
            .map_err(|_| PingError::Unavailable("script engine is not running".to_string()))
    }

    /// Exchanges started but not yet settled.
    pub fn pending_exchanges(&self) -> usize {
        self.pending().len()
    }

    fn pending(&self) -> &PendingExchanges {
        &self.handle.pending
    }

    async fn run(&self, request: PingRequest) -> Result<String, PingError> {
        let deadline = Deadline::new(request.timeout);
        deadline.run(self.initialized()).await??;

        let (id, reply) = self.pending().register();
        let guard = AbortOnDrop {
            backend: self,
            id: Some(id),
        };
        log::info!(
            "[Ping script {}] Starting exchange with {}",
            id,
            request.endpoint
        );

        self.client.execute(format!(
            "__ping_run({}, {}, {});",
            id,
            Value::from(request.endpoint.as_str()),
            Value::from(request.message)
        ));

        // On timeout the guard drops with the error and aborts the socket.
        let outcome = deadline.run(reply).await?;
        guard.disarm();

        match outcome {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(ScriptFailure::NonText)) => {
                log::error!("[Ping script {}] Reply was not UTF-8 text", id);
                Err(PingError::NonTextReply)
            }
            Ok(Err(ScriptFailure::Message(message))) => {
                log::error!("[Ping script {}] Exchange failed: {}", id, message);
                Err(PingError::Script(message))
            }
            Err(_) => Err(PingError::Unavailable(
                "script engine dropped the exchange".to_string(),
            )),
        }
    }
}

/// Tears down a started script exchange unless it settled.
///
/// Covers timeouts and callers that drop the exchange future early.
struct AbortOnDrop<'a> {
    backend: &'a ScriptBackend,
    id: Option<u32>,
}

impl AbortOnDrop<'_> {
    fn disarm(mut self) {
        self.id = None;
    }
}

impl Drop for AbortOnDrop<'_> {
    fn drop(&mut self) {
        if let Some(id) = self.id.take() {
            log::warn!("[Ping script {}] Exchange abandoned, aborting", id);
            self.backend.pending().cancel(id);
            self.backend
                .client
                .execute(format!("__ping_abort({});", id));
        }
    }
}

impl PingBackend for ScriptBackend {
    fn name(&self) -> &'static str {
        "script"
    }

    fn exchange(&self, request: PingRequest) -> BoxFuture<'_, Result<String, PingError>> {
        self.run(request).boxed()
    }
}
