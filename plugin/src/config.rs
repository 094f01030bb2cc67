//! Ping configuration.
//!
//! Loaded from a JSON file and then patched from `WS_PING_*` environment
//! variables. Every field has a default, so an empty object is valid.

use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{fs, io};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ping::{Endpoint, PingError, PingRequest};

pub const DEFAULT_ENDPOINT: &str = "wss://echo.websocket.events";
pub const DEFAULT_MESSAGE: &str = "Hello, world!";
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

pub const ENV_ENDPOINT: &str = "WS_PING_ENDPOINT";
pub const ENV_MESSAGE: &str = "WS_PING_MESSAGE";
pub const ENV_TIMEOUT_MS: &str = "WS_PING_TIMEOUT_MS";
pub const ENV_BACKEND: &str = "WS_PING_BACKEND";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid ping configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid value {value:?} for {var}: {reason}")]
    InvalidEnv {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Which implementation of the ping contract runs the exchanges.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// tokio-tungstenite, in process.
    #[default]
    Native,
    /// The `wsPing` shim inside the embedded script engine.
    Script,
}

impl std::str::FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "native" => Ok(BackendKind::Native),
            "script" => Ok(BackendKind::Script),
            other => Err(format!("unknown backend `{other}`, expected `native` or `script`")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PingConfig {
    pub endpoint: String,
    pub message: String,
    /// Exchange bound in milliseconds. `0` disables the bound.
    pub timeout_ms: u64,
    pub backend: BackendKind,
}

impl Default for PingConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            message: DEFAULT_MESSAGE.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            backend: BackendKind::default(),
        }
    }
}

impl PingConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json_str(&json)?;
        log::info!("Loaded ping configuration from {}", path.display());
        Ok(config)
    }

    /// Like [`PingConfig::load`], but a missing file yields the defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        match Self::load(&path) {
            Err(ConfigError::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                log::info!(
                    "No ping configuration at {}, using defaults",
                    path.as_ref().display()
                );
                Ok(Self::default())
            }
            other => other,
        }
    }

    /// Apply `WS_PING_*` variables from the process environment.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(|var| std::env::var(var).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(endpoint) = lookup(ENV_ENDPOINT) {
            self.endpoint = endpoint;
        }
        if let Some(message) = lookup(ENV_MESSAGE) {
            self.message = message;
        }
        if let Some(value) = lookup(ENV_TIMEOUT_MS) {
            self.timeout_ms = value.trim().parse::<u64>().map_err(|e| {
                ConfigError::InvalidEnv {
                    var: ENV_TIMEOUT_MS,
                    value: value.clone(),
                    reason: e.to_string(),
                }
            })?;
        }
        if let Some(value) = lookup(ENV_BACKEND) {
            self.backend = value.parse().map_err(|reason| ConfigError::InvalidEnv {
                var: ENV_BACKEND,
                value: value.clone(),
                reason,
            })?;
        }
        Ok(self)
    }

    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }

    /// Build the request the UI sends on every press.
    pub fn request(&self) -> Result<PingRequest, PingError> {
        let endpoint = Endpoint::parse(&self.endpoint)?;
        Ok(PingRequest::new(endpoint, self.message.clone()).with_timeout(self.timeout()))
    }
}
