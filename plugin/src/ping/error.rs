use std::time::Duration;

use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Why an exchange failed.
///
/// Callers should treat every variant as the same "exchange failed" outcome;
/// the variants only carry what the transport reported.
#[derive(Debug, Error)]
pub enum PingError {
    #[error("invalid endpoint `{endpoint}`: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("connection failed: {0}")]
    Connect(#[source] tungstenite::Error),

    #[error("failed to send message: {0}")]
    Send(#[source] tungstenite::Error),

    #[error("failed to receive reply: {0}")]
    Receive(#[source] tungstenite::Error),

    #[error("connection closed before a reply arrived (code {code}{})", format_reason(.reason))]
    ClosedBeforeReply { code: u16, reason: String },

    #[error("reply was not valid UTF-8 text")]
    NonTextReply,

    #[error("no reply within {0:?}")]
    TimedOut(Duration),

    #[error("script exchange failed: {0}")]
    Script(String),

    #[error("ping backend unavailable: {0}")]
    Unavailable(String),
}

fn format_reason(reason: &str) -> String {
    if reason.is_empty() {
        String::new()
    } else {
        format!(", {reason}")
    }
}

impl PingError {
    pub(crate) fn invalid_endpoint(endpoint: &str, reason: impl ToString) -> Self {
        PingError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason: reason.to_string(),
        }
    }

    /// True when the wait bound expired before the exchange finished.
    pub fn is_timeout(&self) -> bool {
        matches!(self, PingError::TimedOut(_))
    }
}
