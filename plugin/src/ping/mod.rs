//! Single-exchange WebSocket ping.
//!
//! One call opens a fresh connection, sends one text frame, waits for the
//! first reply and closes the connection again, on success and on failure.
//!
//! ```no_run
//! # async fn run() -> Result<(), bevy_ws_ping::PingError> {
//! let reply = bevy_ws_ping::ping("wss://echo.websocket.events", "Hello, world!").await?;
//! println!("{reply}");
//! # Ok(())
//! # }
//! ```

mod client;
mod endpoint;
mod error;
mod exchange;

use std::future::Future;
use std::time::Duration;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use tokio::time::Instant;

pub use client::{PingClient, PingReport, PingReportReceiver};
pub use endpoint::Endpoint;
pub use error::PingError;

/// Bound applied by [`ping`] when the caller does not pick one.
pub const DEFAULT_EXCHANGE_TIMEOUT: Duration = Duration::from_secs(10);

/// Upper bound for the close handshake once the exchange itself is over.
pub const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// Everything needed for one exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PingRequest {
    pub endpoint: Endpoint,
    pub message: String,
    /// `None` waits forever.
    pub timeout: Option<Duration>,
}

impl PingRequest {
    pub fn new(endpoint: Endpoint, message: impl Into<String>) -> Self {
        Self {
            endpoint,
            message: message.into(),
            timeout: Some(DEFAULT_EXCHANGE_TIMEOUT),
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Result of one exchange as seen by the UI.
#[derive(Debug)]
pub enum ExchangeOutcome {
    Reply(String),
    Failed(PingError),
}

impl ExchangeOutcome {
    pub fn is_reply(&self) -> bool {
        matches!(self, ExchangeOutcome::Reply(_))
    }

    pub fn into_result(self) -> Result<String, PingError> {
        match self {
            ExchangeOutcome::Reply(reply) => Ok(reply),
            ExchangeOutcome::Failed(err) => Err(err),
        }
    }
}

impl From<Result<String, PingError>> for ExchangeOutcome {
    fn from(result: Result<String, PingError>) -> Self {
        match result {
            Ok(reply) => ExchangeOutcome::Reply(reply),
            Err(err) => ExchangeOutcome::Failed(err),
        }
    }
}

/// Something that can run one ping exchange.
///
/// Implementations must close whatever connection they opened before the
/// returned future completes, including when the request times out.
pub trait PingBackend: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    fn exchange(&self, request: PingRequest) -> BoxFuture<'_, Result<String, PingError>>;
}

/// Talks to the server directly through tokio-tungstenite.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeBackend;

impl PingBackend for NativeBackend {
    fn name(&self) -> &'static str {
        "native"
    }

    fn exchange(&self, request: PingRequest) -> BoxFuture<'_, Result<String, PingError>> {
        async move { exchange::run(&request).await }.boxed()
    }
}

/// Ping `endpoint` with `message` and return the first reply.
///
/// Waits at most [`DEFAULT_EXCHANGE_TIMEOUT`].
pub async fn ping(endpoint: &str, message: &str) -> Result<String, PingError> {
    ping_with_timeout(endpoint, message, Some(DEFAULT_EXCHANGE_TIMEOUT)).await
}

/// Like [`ping`], with an explicit bound. `None` never gives up.
pub async fn ping_with_timeout(
    endpoint: &str,
    message: &str,
    timeout: Option<Duration>,
) -> Result<String, PingError> {
    let request = PingRequest::new(Endpoint::parse(endpoint)?, message).with_timeout(timeout);
    NativeBackend.exchange(request).await
}

/// A shared wait bound for the steps of one exchange.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Deadline {
    limit: Option<Duration>,
    at: Option<Instant>,
}

impl Deadline {
    pub(crate) fn new(limit: Option<Duration>) -> Self {
        Self {
            limit,
            at: limit.map(|limit| Instant::now() + limit),
        }
    }

    /// Run `fut`, failing with [`PingError::TimedOut`] once the bound passes.
    pub(crate) async fn run<F: Future>(&self, fut: F) -> Result<F::Output, PingError> {
        match (self.at, self.limit) {
            (Some(at), Some(limit)) => tokio::time::timeout_at(at, fut)
                .await
                .map_err(|_| PingError::TimedOut(limit)),
            _ => Ok(fut.await),
        }
    }
}
