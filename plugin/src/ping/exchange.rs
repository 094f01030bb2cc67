//! The connect / send / receive / close sequence over tokio-tungstenite.

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use crate::ping::{CLOSE_TIMEOUT, Deadline, PingError, PingRequest};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Close code reported when the stream ends without a close frame.
const ABNORMAL_CLOSURE: u16 = 1006;

pub(crate) async fn run(request: &PingRequest) -> Result<String, PingError> {
    let endpoint = &request.endpoint;
    let deadline = Deadline::new(request.timeout);

    log::info!("[Ping] Connecting to {}", endpoint);

    // A connect that loses the race is dropped here, which drops its TCP stream.
    let (mut socket, response) = deadline
        .run(connect_async(endpoint.as_str()))
        .await?
        .map_err(|e| {
            log::error!("[Ping] Connection to {} failed: {}", endpoint, e);
            PingError::Connect(e)
        })?;

    log::info!(
        "[Ping] Connected to {} (status: {})",
        endpoint,
        response.status()
    );

    let result = deadline
        .run(send_and_receive(&mut socket, &request.message))
        .await
        .and_then(|inner| inner);

    close(&mut socket).await;

    match &result {
        Ok(reply) => log::debug!("[Ping] Reply: {}", preview(reply)),
        Err(e) => log::error!("[Ping] Exchange with {} failed: {}", endpoint, e),
    }

    result
}

async fn send_and_receive(socket: &mut Socket, message: &str) -> Result<String, PingError> {
    socket
        .send(Message::text(message.to_owned()))
        .await
        .map_err(PingError::Send)?;

    log::debug!("[Ping] Sent: {}", preview(message));

    while let Some(frame) = socket.next().await {
        match frame.map_err(PingError::Receive)? {
            Message::Text(text) => return Ok(text.as_str().to_owned()),
            Message::Binary(data) => {
                return String::from_utf8(data.to_vec()).map_err(|_| PingError::NonTextReply);
            }
            Message::Close(frame) => {
                let (code, reason) = frame
                    .map(|f| (u16::from(f.code), f.reason.as_str().to_owned()))
                    .unwrap_or((u16::from(CloseCode::Status), String::new()));
                return Err(PingError::ClosedBeforeReply { code, reason });
            }
            // Control frames are answered by tungstenite itself.
            Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
        }
    }

    Err(PingError::ClosedBeforeReply {
        code: ABNORMAL_CLOSURE,
        reason: "stream ended".to_string(),
    })
}

async fn close(socket: &mut Socket) {
    match tokio::time::timeout(CLOSE_TIMEOUT, socket.close(None)).await {
        Ok(Ok(())) => log::debug!("[Ping] Connection closed"),
        Ok(Err(e)) => log::debug!("[Ping] Close after exchange: {}", e),
        Err(_) => log::warn!("[Ping] Close handshake timed out, dropping connection"),
    }
}

fn preview(text: &str) -> &str {
    match text.char_indices().nth(100) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
