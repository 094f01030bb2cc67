//! `wsPing` for scripts.
//!
//! Scripts get `wsPing(endpoint, message) -> Promise<string>`, written
//! against the `WebSocket` shim. Rust drives the same code path through
//! [`ScriptBackend`], which makes the script engine a second implementation
//! of the ping contract.

mod backend;
mod pending;

use boa_engine::{Context, JsError, JsResult, JsString, JsValue, NativeFunction, Source};
use tokio::sync::watch;

use crate::js::websocket::NON_TEXT_ERROR;
use crate::js::{JsEngine, JsEngineBuilder, JsEngineClient, JsEngineExtension, WebSocketExtension};

pub use backend::ScriptBackend;
pub(crate) use pending::{PendingExchanges, ScriptFailure};

/// Registers the `wsPing` API. Needs [`WebSocketExtension`] in the same engine.
pub struct PingExtension {
    pending: PendingExchanges,
    ready: watch::Sender<bool>,
}

/// Rust-side view of a [`PingExtension`] once it is handed to an engine.
#[derive(Clone)]
pub struct ScriptHandle {
    pending: PendingExchanges,
    ready: watch::Receiver<bool>,
}

impl PingExtension {
    pub fn new() -> (PingExtension, ScriptHandle) {
        let pending = PendingExchanges::default();
        let (ready, ready_rx) = watch::channel(false);

        (
            PingExtension {
                pending: pending.clone(),
                ready,
            },
            ScriptHandle {
                pending,
                ready: ready_rx,
            },
        )
    }
}

impl JsEngineExtension for PingExtension {
    fn register(&self, context: &mut Context, _client: JsEngineClient) -> Result<(), JsError> {
        // __ping_settle(id: number, ok: boolean, value: string, kind?: string) -> void
        context.register_global_callable(
            JsString::from("__ping_settle"),
            4,
            NativeFunction::from_copy_closure_with_captures(
                |_this: &JsValue,
                 args: &[JsValue],
                 pending: &PendingExchanges,
                 ctx: &mut Context| { settle_fn(args, pending, ctx) },
                self.pending.clone(),
            ),
        )?;

        context.eval(Source::from_bytes(PING_SHIM.as_bytes()))?;

        self.ready.send_replace(true);
        log::info!("Registered wsPing script API");
        Ok(())
    }

    fn shutdown(&self) {
        self.ready.send_replace(false);
        self.pending.fail_all("script engine stopped");
    }
}

fn settle_fn(args: &[JsValue], pending: &PendingExchanges, ctx: &mut Context) -> JsResult<JsValue> {
    let id = args
        .first()
        .map(|v| v.to_u32(ctx))
        .transpose()?
        .unwrap_or(0);
    let ok = args.get(1).is_some_and(JsValue::to_boolean);
    let value = match args.get(2) {
        Some(v) => v.to_string(ctx)?.to_std_string_escaped(),
        None => String::new(),
    };

    let non_text = match args.get(3) {
        Some(v) if !v.is_undefined() && !v.is_null() => {
            v.to_string(ctx)?.to_std_string_escaped() == NON_TEXT_ERROR
        }
        _ => false,
    };

    let outcome = match (ok, non_text) {
        (true, _) => Ok(value),
        (false, true) => Err(ScriptFailure::NonText),
        (false, false) => Err(ScriptFailure::Message(value)),
    };
    if !pending.settle(id, outcome) {
        log::debug!("[Ping script {}] Outcome arrived after the exchange was dropped", id);
    }
    Ok(JsValue::undefined())
}

/// Build an engine with the WebSocket and ping extensions and a backend for it.
pub fn start_script_engine() -> (JsEngine, ScriptBackend) {
    let (extension, handle) = PingExtension::new();
    let engine = JsEngineBuilder::new()
        .with_extension(WebSocketExtension)
        .with_extension(extension)
        .start();
    let backend = ScriptBackend::new(engine.client(), handle);
    (engine, backend)
}

const PING_SHIM: &str = r#"
(function() {
    // Sockets of exchanges started by __ping_run, so they can be aborted
    var running = {};

    // One open -> send -> first reply -> close sequence. done(ok, value, kind) runs once.
    function exchange(endpoint, message, done) {
        var socket = new WebSocket(endpoint);
        var finished = false;

        function finish(ok, value, kind) {
            if (finished) return;
            finished = true;
            socket.close();
            done(ok, value, kind);
        }

        socket.onopen = function() {
            try { socket.send(message); } catch (e) { finish(false, e && e.message || String(e)); }
        };
        socket.onmessage = function(event) { finish(true, String(event.data)); };
        socket.onerror = function(event) {
            finish(false, event.message || 'WebSocket error', event.kind);
        };
        socket.onclose = function(event) {
            finish(false, 'connection closed before a reply arrived (code ' + event.code + ')');
        };
        return socket;
    }

    globalThis.wsPing = function(endpoint, message) {
        return new Promise(function(resolve, reject) {
            exchange(endpoint, String(message), function(ok, value) {
                if (ok) { resolve(value); } else { reject(new Error(value)); }
            });
        });
    };

    globalThis.__ping_run = function(id, endpoint, message) {
        try {
            running[id] = exchange(endpoint, message, function(ok, value, kind) {
                delete running[id];
                __ping_settle(id, ok, value, kind);
            });
        } catch (e) {
            __ping_settle(id, false, e && e.message || String(e));
        }
    };

    globalThis.__ping_abort = function(id) {
        var socket = running[id];
        if (!socket) return;
        delete running[id];
        socket.onopen = null;
        socket.onmessage = null;
        socket.onerror = null;
        socket.onclose = null;
        socket.close();
    };
})();
"#;
