use boa_engine::{Context, JsError, JsNativeError, JsResult, JsString, JsValue, NativeFunction, Source};

use crate::js::JsEngineClient;
use crate::js::JsEngineExtension;
use crate::js::websocket::manager::WebSocketManager;
use crate::ping::Endpoint;

/// Installs a browser-style `WebSocket` class backed by tokio-tungstenite.
#[derive(Debug, Default, Clone, Copy)]
pub struct WebSocketExtension;

impl JsEngineExtension for WebSocketExtension {
    fn register(&self, context: &mut Context, client: JsEngineClient) -> Result<(), JsError> {
        let manager = WebSocketManager::new(client);
        register_websocket_functions(context, manager)?;
        context.eval(Source::from_bytes(WEBSOCKET_SHIM.as_bytes()))?;
        log::info!("Registered WebSocket shim");
        Ok(())
    }
}

fn string_arg(args: &[JsValue], index: usize) -> String {
    args.get(index)
        .and_then(|v| v.as_string())
        .map(|s| s.to_std_string_escaped())
        .unwrap_or_default()
}

fn u32_arg(args: &[JsValue], index: usize, ctx: &mut Context) -> Option<u32> {
    args.get(index).and_then(|v| v.to_u32(ctx).ok())
}

fn connect_fn(args: &[JsValue], manager: &WebSocketManager) -> JsResult<JsValue> {
    let url = string_arg(args, 0);
    log::info!("[WebSocket Native] connect({})", url);

    let endpoint = Endpoint::parse(&url).map_err(|e| {
        JsError::from(
            JsNativeError::syntax()
                .with_message(format!("Failed to construct 'WebSocket': {e}")),
        )
    })?;

    Ok(JsValue::from(manager.connect(endpoint)))
}

fn send_fn(args: &[JsValue], manager: &WebSocketManager, ctx: &mut Context) -> JsResult<JsValue> {
    let id = u32_arg(args, 0, ctx).unwrap_or(0);
    let data = string_arg(args, 1);

    log::debug!("[WebSocket Native] send({}, {} bytes)", id, data.len());
    manager
        .send(id, data)
        .map_err(|e| JsError::from(JsNativeError::error().with_message(e)))?;
    Ok(JsValue::undefined())
}

fn close_fn(args: &[JsValue], manager: &WebSocketManager, ctx: &mut Context) -> JsResult<JsValue> {
    let id = u32_arg(args, 0, ctx).unwrap_or(0);
    let code = u32_arg(args, 1, ctx)
        .and_then(|code| u16::try_from(code).ok())
        .unwrap_or(1000);
    let reason = string_arg(args, 2);

    log::info!("[WebSocket Native] close({}, {}, {})", id, code, reason);
    manager.close(id, code, reason);
    Ok(JsValue::undefined())
}

/// Register WebSocket native functions
fn register_websocket_functions(
    context: &mut Context,
    manager: WebSocketManager,
) -> Result<(), JsError> {
    // __ws_connect(url: string) -> number
    context.register_global_callable(
        JsString::from("__ws_connect"),
        1,
        NativeFunction::from_copy_closure_with_captures(
            |_this: &JsValue, args: &[JsValue], manager: &WebSocketManager, _ctx: &mut Context| {
                connect_fn(args, manager)
            },
            manager.clone(),
        ),
    )?;

    // __ws_send(id: number, data: string) -> void
    context.register_global_callable(
        JsString::from("__ws_send"),
        2,
        NativeFunction::from_copy_closure_with_captures(
            |_this: &JsValue, args: &[JsValue], manager: &WebSocketManager, ctx: &mut Context| {
                send_fn(args, manager, ctx)
            },
            manager.clone(),
        ),
    )?;

    // __ws_close(id: number, code: number, reason: string) -> void
    context.register_global_callable(
        JsString::from("__ws_close"),
        3,
        NativeFunction::from_copy_closure_with_captures(
            |_this: &JsValue, args: &[JsValue], manager: &WebSocketManager, ctx: &mut Context| {
                close_fn(args, manager, ctx)
            },
            manager.clone(),
        ),
    )?;

    // __ws_ready_state(id: number) -> number
    context.register_global_callable(
        JsString::from("__ws_ready_state"),
        1,
        NativeFunction::from_copy_closure_with_captures(
            |_this: &JsValue, args: &[JsValue], manager: &WebSocketManager, ctx: &mut Context| {
                let id = u32_arg(args, 0, ctx).unwrap_or(0);
                Ok(JsValue::from(manager.ready_state(id)))
            },
            manager,
        ),
    )?;

    Ok(())
}

const WEBSOCKET_SHIM: &str = r#"
(function() {
    // Live sockets by connection id
    var sockets = {};

    // Called from Rust for every connection event
    globalThis.__ws_dispatch_event = function(id, eventType, eventData) {
        var ws = sockets[id];
        if (!ws) {
            return;
        }

        var event = Object.assign({ type: eventType, target: ws }, eventData);

        if (eventType === 'open') {
            ws._readyState = 1;
        } else if (eventType === 'close') {
            ws._readyState = 3;
            event.wasClean = (event.code === 1000);
            delete sockets[id];
        }

        var handler = ws['on' + eventType];
        if (typeof handler === 'function') {
            try { handler.call(ws, event); } catch (e) { console.error('[WebSocket] on' + eventType + ' error:', e); }
        }

        var listeners = (ws._listeners[eventType] || []).slice();
        for (var i = 0; i < listeners.length; i++) {
            try { listeners[i].call(ws, event); } catch (e) { console.error('[WebSocket] listener error:', e); }
        }
    };

    function WebSocket(url) {
        if (!(this instanceof WebSocket)) {
            throw new TypeError("Failed to construct 'WebSocket': Please use the 'new' operator");
        }

        this._url = String(url);
        this._readyState = 0;
        this._listeners = {};
        this.onopen = null;
        this.onmessage = null;
        this.onerror = null;
        this.onclose = null;

        // Throws a SyntaxError for anything that is not ws:// or wss://
        this._id = __ws_connect(this._url);
        sockets[this._id] = this;
    }

    WebSocket.CONNECTING = 0;
    WebSocket.OPEN = 1;
    WebSocket.CLOSING = 2;
    WebSocket.CLOSED = 3;

    Object.defineProperties(WebSocket.prototype, {
        url: { get: function() { return this._url; } },
        readyState: { get: function() { return this._readyState; } }
    });

    WebSocket.prototype.send = function(data) {
        if (this._readyState !== 1) {
            throw new Error("Failed to execute 'send' on 'WebSocket': socket is not open.");
        }
        __ws_send(this._id, String(data));
    };

    WebSocket.prototype.close = function(code, reason) {
        if (this._readyState === 2 || this._readyState === 3) return;
        this._readyState = 2;
        __ws_close(this._id, code || 1000, reason || '');
    };

    WebSocket.prototype.addEventListener = function(type, listener) {
        (this._listeners[type] = this._listeners[type] || []).push(listener);
    };

    WebSocket.prototype.removeEventListener = function(type, listener) {
        var list = this._listeners[type];
        if (!list) return;
        var idx = list.indexOf(listener);
        if (idx !== -1) list.splice(idx, 1);
    };

    globalThis.WebSocket = WebSocket;
})();
"#;
