//! Local WebSocket server for the integration tests.
//!
//! Each accepted connection runs one [`Behavior`] and leaves a
//! [`ConnectionLog`] behind once the peer goes away.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;

/// Sent by [`Behavior::InvalidUtf8Binary`].
pub const INVALID_UTF8: [u8; 3] = [0xff, 0xfe, 0x41];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    /// Send every text or binary frame straight back.
    Echo,
    /// Answer text frames with a binary frame holding the same bytes.
    EchoBinary,
    /// Answer text frames with a binary frame that is not valid UTF-8.
    InvalidUtf8Binary,
    /// Read everything, answer nothing.
    Silent,
    /// Close with 1001 right after the handshake.
    CloseImmediately,
}

/// What one client did on its connection.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConnectionLog {
    /// Data frames received, in order.
    pub received: Vec<String>,
    /// The client sent a close frame.
    pub saw_close: bool,
}

pub struct TestServer {
    addr: SocketAddr,
    logs: Arc<Mutex<Vec<ConnectionLog>>>,
    frames: Arc<AtomicUsize>,
    task: JoinHandle<()>,
}

impl TestServer {
    pub async fn start(behavior: Behavior) -> TestServer {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test server");
        let addr = listener.local_addr().expect("test server address");
        let logs = Arc::new(Mutex::new(Vec::new()));
        let frames = Arc::new(AtomicUsize::new(0));

        let task = tokio::spawn({
            let logs = logs.clone();
            let frames = frames.clone();
            async move {
                while let Ok((stream, _)) = listener.accept().await {
                    let logs = logs.clone();
                    let frames = frames.clone();
                    tokio::spawn(async move {
                        let Ok(ws) = accept_async(stream).await else {
                            return;
                        };
                        let log = serve(ws, behavior, &frames).await;
                        logs.lock().unwrap().push(log);
                    });
                }
            }
        });

        TestServer {
            addr,
            logs,
            frames,
            task,
        }
    }

    pub fn url(&self) -> String {
        format!("ws://{}/", self.addr)
    }

    /// Data frames received so far, over all connections.
    pub fn frames_received(&self) -> usize {
        self.frames.load(Ordering::SeqCst)
    }

    /// Wait until `count` connections have ended and return their logs.
    pub async fn finished_connections(&self, count: usize) -> Vec<ConnectionLog> {
        for _ in 0..200 {
            {
                let logs = self.logs.lock().unwrap();
                if logs.len() >= count {
                    return logs.clone();
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("expected {count} finished connections");
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve<S>(
    mut ws: tokio_tungstenite::WebSocketStream<S>,
    behavior: Behavior,
    frames: &AtomicUsize,
) -> ConnectionLog
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    let mut log = ConnectionLog::default();

    if behavior == Behavior::CloseImmediately {
        let _ = ws
            .close(Some(CloseFrame {
                code: CloseCode::Away,
                reason: "going away".into(),
            }))
            .await;
    }

    while let Some(Ok(message)) = ws.next().await {
        match message {
            Message::Text(text) => {
                frames.fetch_add(1, Ordering::SeqCst);
                log.received.push(text.as_str().to_owned());
                let reply = match behavior {
                    Behavior::Echo => Some(Message::Text(text)),
                    Behavior::EchoBinary => Some(Message::binary(text.as_bytes().to_vec())),
                    Behavior::InvalidUtf8Binary => Some(Message::binary(INVALID_UTF8.to_vec())),
                    Behavior::Silent | Behavior::CloseImmediately => None,
                };
                if let Some(reply) = reply {
                    let _ = ws.send(reply).await;
                }
            }
            Message::Binary(data) => {
                frames.fetch_add(1, Ordering::SeqCst);
                log.received.push(String::from_utf8_lossy(&data).into_owned());
                if behavior == Behavior::Echo {
                    let _ = ws.send(Message::Binary(data)).await;
                }
            }
            // tungstenite answers the close on the next read
            Message::Close(_) => log.saw_close = true,
            _ => {}
        }
    }

    log
}

/// A local address nothing listens on.
pub async fn refused_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind probe listener");
    let addr = listener.local_addr().expect("probe address");
    drop(listener);
    format!("ws://{addr}/")
}
