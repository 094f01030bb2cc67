//! Rust side of the script `WebSocket` class.
//!
//! Each connection runs as a task on the shared runtime. Events are pushed
//! back into JS via `JsEngineClient::execute()` as `__ws_dispatch_event` calls.

use boa_gc::{Finalize, Trace, empty_trace};
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;

use crate::js::JsEngineClient;
use crate::ping::{CLOSE_TIMEOUT, Endpoint};
use crate::runtime;

/// WebSocket ready states (matching browser API)
pub const WS_CONNECTING: u32 = 0;
pub const WS_OPEN: u32 = 1;
pub const WS_CLOSING: u32 = 2;
pub const WS_CLOSED: u32 = 3;

const ABNORMAL_CLOSURE: u16 = 1006;

/// `kind` of the error event raised for a binary frame that is not UTF-8 text.
pub(crate) const NON_TEXT_ERROR: &str = "non-text";

/// What the script asked the connection task to do.
#[derive(Debug)]
enum Outbound {
    Text(String),
    Close { code: u16, reason: String },
}

/// A handle to send messages to a WebSocket connection
#[derive(Clone)]
struct WebSocketHandle {
    sender: mpsc::UnboundedSender<Outbound>,
    ready_state: Arc<AtomicU32>,
}

/// Manages all WebSocket connections opened by one engine
#[derive(Clone, Finalize)]
pub(crate) struct WebSocketManager {
    client: JsEngineClient,
    connections: Arc<Mutex<HashMap<u32, WebSocketHandle>>>,
    next_id: Arc<AtomicU32>,
}

unsafe impl Trace for WebSocketManager {
    empty_trace!();
}

impl WebSocketManager {
    pub(crate) fn new(client: JsEngineClient) -> Self {
        Self {
            client,
            connections: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(AtomicU32::new(1)),
        }
    }

    fn connections(&self) -> MutexGuard<'_, HashMap<u32, WebSocketHandle>> {
        self.connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Push an event to JS by executing code
    fn dispatch_event(&self, id: u32, event_type: &str, data: Value) {
        log::debug!("[WebSocket {}] Dispatching {} event to JS", id, event_type);
        let script = format!(
            "__ws_dispatch_event({}, {}, {});",
            id,
            Value::from(event_type),
            data
        );
        self.client.execute(script);
    }

    fn fail(&self, id: u32, ready_state: &AtomicU32, message: String, reason: &str) {
        ready_state.store(WS_CLOSED, Ordering::SeqCst);
        self.dispatch_event(id, "error", json!({ "message": message }));
        self.dispatch_event(
            id,
            "close",
            json!({ "code": ABNORMAL_CLOSURE, "reason": reason }),
        );
    }

    /// Connect to a WebSocket endpoint, returns the connection ID immediately
    pub(crate) fn connect(&self, endpoint: Endpoint) -> u32 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = mpsc::unbounded_channel();
        let ready_state = Arc::new(AtomicU32::new(WS_CONNECTING));

        self.connections().insert(
            id,
            WebSocketHandle {
                sender: tx,
                ready_state: ready_state.clone(),
            },
        );

        let manager = self.clone();
        runtime::handle().spawn(async move {
            manager.run_connection(id, endpoint, rx, &ready_state).await;
            ready_state.store(WS_CLOSED, Ordering::SeqCst);
            manager.connections().remove(&id);
            log::info!("[WebSocket {}] Connection ended", id);
        });

        id
    }

    async fn run_connection(
        &self,
        id: u32,
        endpoint: Endpoint,
        mut rx: mpsc::UnboundedReceiver<Outbound>,
        ready_state: &AtomicU32,
    ) {
        log::info!("[WebSocket {}] Connecting to {}", id, endpoint);

        let ws_stream = match connect_async(endpoint.as_str()).await {
            Ok((stream, response)) => {
                log::info!(
                    "[WebSocket {}] Connected successfully (status: {})",
                    id,
                    response.status()
                );
                stream
            }
            Err(e) => {
                log::error!("[WebSocket {}] Connection failed: {}", id, e);
                self.fail(
                    id,
                    ready_state,
                    format!("Connection failed: {e}"),
                    "Connection failed",
                );
                return;
            }
        };

        // The script may have called close() while we were connecting.
        if ready_state
            .compare_exchange(WS_CONNECTING, WS_OPEN, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            self.dispatch_event(id, "open", json!({}));
        }

        let (mut write, mut read) = ws_stream.split();
        let mut closing = false;
        let mut close_deadline = Instant::now();

        loop {
            tokio::select! {
                outbound = rx.recv(), if !closing => {
                    match outbound {
                        Some(Outbound::Text(text)) => {
                            if let Err(e) = write.send(Message::text(text)).await {
                                log::error!("[WebSocket {}] Send error: {}", id, e);
                                self.fail(id, ready_state, e.to_string(), "Send failed");
                                return;
                            }
                        }
                        Some(Outbound::Close { code, reason }) => {
                            log::info!("[WebSocket {}] Closing ({} {})", id, code, reason);
                            closing = true;
                            close_deadline = Instant::now() + CLOSE_TIMEOUT;
                            let frame = CloseFrame {
                                code: CloseCode::from(code),
                                reason: reason.into(),
                            };
                            if let Err(e) = write.send(Message::Close(Some(frame))).await {
                                log::debug!("[WebSocket {}] Close frame not sent: {}", id, e);
                            }
                        }
                        None => {
                            // Manager dropped the handle; nobody can talk to us anymore.
                            closing = true;
                            close_deadline = Instant::now() + CLOSE_TIMEOUT;
                            if let Err(e) = write.send(Message::Close(None)).await {
                                log::debug!("[WebSocket {}] Close frame not sent: {}", id, e);
                            }
                        }
                    }
                }
                incoming = read.next() => {
                    match incoming {
                        Some(Ok(Message::Text(text))) => {
                            log::debug!(
                                "[WebSocket {}] Received: {}",
                                id,
                                text.as_str().chars().take(100).collect::<String>()
                            );
                            self.dispatch_event(id, "message", json!({ "data": text.as_str() }));
                        }
                        Some(Ok(Message::Binary(data))) => {
                            log::debug!("[WebSocket {}] Received binary ({} bytes)", id, data.len());
                            match std::str::from_utf8(&data) {
                                Ok(text) => {
                                    self.dispatch_event(id, "message", json!({ "data": text }));
                                }
                                // The socket stays open; the script decides whether to close it.
                                Err(e) => {
                                    log::warn!("[WebSocket {}] Binary frame is not UTF-8: {}", id, e);
                                    self.dispatch_event(
                                        id,
                                        "error",
                                        json!({
                                            "message": "reply was not valid UTF-8 text",
                                            "kind": NON_TEXT_ERROR,
                                        }),
                                    );
                                }
                            }
                        }
                        Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) | Some(Ok(Message::Frame(_))) => {
                            // Handled by tungstenite
                        }
                        Some(Ok(Message::Close(frame))) => {
                            let (code, reason) = frame
                                .map(|f| (u16::from(f.code), f.reason.as_str().to_owned()))
                                .unwrap_or((1000, String::new()));
                            log::info!("[WebSocket {}] Received close: {} {}", id, code, reason);
                            ready_state.store(WS_CLOSED, Ordering::SeqCst);
                            self.dispatch_event(id, "close", json!({ "code": code, "reason": reason }));
                            return;
                        }
                        Some(Err(e)) if closing => {
                            log::debug!("[WebSocket {}] Error while closing: {}", id, e);
                            ready_state.store(WS_CLOSED, Ordering::SeqCst);
                            self.dispatch_event(id, "close", json!({ "code": 1000, "reason": "" }));
                            return;
                        }
                        Some(Err(e)) => {
                            log::error!("[WebSocket {}] Read error: {}", id, e);
                            self.fail(id, ready_state, e.to_string(), "Connection error");
                            return;
                        }
                        None => {
                            ready_state.store(WS_CLOSED, Ordering::SeqCst);
                            self.dispatch_event(
                                id,
                                "close",
                                json!({ "code": ABNORMAL_CLOSURE, "reason": "Connection ended" }),
                            );
                            return;
                        }
                    }
                }
                _ = tokio::time::sleep_until(close_deadline), if closing => {
                    log::warn!("[WebSocket {}] Close handshake timed out", id);
                    ready_state.store(WS_CLOSED, Ordering::SeqCst);
                    self.dispatch_event(
                        id,
                        "close",
                        json!({ "code": ABNORMAL_CLOSURE, "reason": "Close timed out" }),
                    );
                    return;
                }
            }
        }
    }

    /// Send a message on a WebSocket connection
    pub(crate) fn send(&self, id: u32, data: String) -> Result<(), String> {
        let connections = self.connections();
        let Some(handle) = connections.get(&id) else {
            return Err("WebSocket not found".to_string());
        };
        if handle.ready_state.load(Ordering::SeqCst) != WS_OPEN {
            return Err("WebSocket is not open".to_string());
        }
        handle
            .sender
            .send(Outbound::Text(data))
            .map_err(|e| format!("Failed to send: {}", e))
    }

    /// Start the close handshake on a WebSocket connection
    pub(crate) fn close(&self, id: u32, code: u16, reason: String) {
        let connections = self.connections();
        let Some(handle) = connections.get(&id) else {
            return;
        };
        let state = handle.ready_state.swap(WS_CLOSING, Ordering::SeqCst);
        if state == WS_CLOSING || state == WS_CLOSED {
            handle.ready_state.store(state, Ordering::SeqCst);
            return;
        }
        if handle.sender.send(Outbound::Close { code, reason }).is_err() {
            log::debug!("[WebSocket {}] Connection task already gone", id);
        }
    }

    /// Get the ready state of a connection
    pub(crate) fn ready_state(&self, id: u32) -> u32 {
        self.connections()
            .get(&id)
            .map(|h| h.ready_state.load(Ordering::SeqCst))
            .unwrap_or(WS_CLOSED)
    }

    /// Number of connections whose task is still running.
    #[cfg(test)]
    pub(crate) fn open_connections(&self) -> usize {
        self.connections().len()
    }
}
