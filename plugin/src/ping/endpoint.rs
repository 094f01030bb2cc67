use std::fmt;
use std::str::FromStr;

use url::Url;

use crate::ping::PingError;

/// Address of a remote WebSocket server.
///
/// Only the checks a browser socket constructor would make are applied: the
/// string must parse as a URL and use the `ws` or `wss` scheme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint(Url);

impl Endpoint {
    pub fn parse(endpoint: &str) -> Result<Self, PingError> {
        if endpoint.trim().is_empty() {
            return Err(PingError::invalid_endpoint(endpoint, "endpoint is empty"));
        }

        let url = Url::parse(endpoint).map_err(|e| PingError::invalid_endpoint(endpoint, e))?;

        match url.scheme() {
            "ws" | "wss" => {}
            other => {
                return Err(PingError::invalid_endpoint(
                    endpoint,
                    format!("unsupported scheme `{other}`, expected `ws` or `wss`"),
                ));
            }
        }

        if url.host_str().is_none_or(str::is_empty) {
            return Err(PingError::invalid_endpoint(endpoint, "missing host"));
        }

        Ok(Self(url))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn is_secure(&self) -> bool {
        self.0.scheme() == "wss"
    }

    pub fn url(&self) -> &Url {
        &self.0
    }
}

impl FromStr for Endpoint {
    type Err = PingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_and_secure_schemes() {
        let plain = Endpoint::parse("ws://127.0.0.1:9001/echo").unwrap();
        assert!(!plain.is_secure());
        assert_eq!(plain.as_str(), "ws://127.0.0.1:9001/echo");

        let secure: Endpoint = "wss://echo.example/".parse().unwrap();
        assert!(secure.is_secure());
        assert_eq!(secure.url().host_str(), Some("echo.example"));
    }

    #[test]
    fn rejects_empty_endpoint() {
        let err = Endpoint::parse("  ").unwrap_err();
        assert!(matches!(err, PingError::InvalidEndpoint { .. }));
    }

    #[test]
    fn rejects_non_websocket_schemes() {
        for endpoint in ["http://example.com", "ftp://example.com/x", "not a url"] {
            let err = Endpoint::parse(endpoint).unwrap_err();
            assert!(
                matches!(err, PingError::InvalidEndpoint { .. }),
                "{endpoint} should be rejected, got {err:?}"
            );
        }
    }

    #[test]
    fn invalid_endpoint_message_names_the_input() {
        let err = Endpoint::parse("http://example.com").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("http://example.com"), "{message}");
        assert!(message.contains("unsupported scheme"), "{message}");
    }
}
