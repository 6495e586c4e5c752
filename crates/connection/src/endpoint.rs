//! Socket URL construction.

use serde::{Deserialize, Serialize};

use courier_protocol::constants::{WS_DEV_HOST, WS_PATH, WS_TOKEN_PARAM};

/// Errors from parsing a hosting origin.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EndpointError {
    #[error("origin has no scheme: {0}")]
    MissingScheme(String),

    #[error("unsupported origin scheme: {0}")]
    UnsupportedScheme(String),

    #[error("origin has no host: {0}")]
    MissingHost(String),
}

/// Deployment environment; development talks to a fixed local server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    #[default]
    Production,
}

/// Where the socket connects, minus the credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketEndpoint {
    secure: bool,
    host: String,
    path: String,
}

impl SocketEndpoint {
    pub fn new(secure: bool, host: impl Into<String>) -> Self {
        Self {
            secure,
            host: host.into(),
            path: WS_PATH.to_string(),
        }
    }

    /// Derives the endpoint from the hosting origin, e.g.
    /// `https://shop.example.com`.
    ///
    /// The scheme mirrors the origin's security (`https`/`wss` give `wss`).
    /// In development the host is always [`WS_DEV_HOST`].
    pub fn from_origin(origin: &str, env: Environment) -> Result<Self, EndpointError> {
        let (scheme, rest) = origin
            .split_once("://")
            .ok_or_else(|| EndpointError::MissingScheme(origin.to_string()))?;
        let secure = match scheme.to_ascii_lowercase().as_str() {
            "https" | "wss" => true,
            "http" | "ws" => false,
            other => return Err(EndpointError::UnsupportedScheme(other.to_string())),
        };
        let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
        if host.is_empty() {
            return Err(EndpointError::MissingHost(origin.to_string()));
        }
        let host = match env {
            Environment::Development => WS_DEV_HOST,
            Environment::Production => host,
        };
        Ok(Self::new(secure, host))
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn is_secure(&self) -> bool {
        self.secure
    }

    /// URL without the credential. Safe to log.
    pub fn base_url(&self) -> String {
        let scheme = if self.secure { "wss" } else { "ws" };
        format!("{scheme}://{}{}", self.host, self.path)
    }

    /// Full URL with the token as a query parameter. Contains the secret;
    /// never log it.
    pub fn url(&self, token: &str) -> String {
        format!("{}?{WS_TOKEN_PARAM}={}", self.base_url(), strip_quotes(token))
    }
}

/// Removes one pair of wrapping double quotes left by tokens persisted as
/// JSON strings. Nothing else is touched, whitespace included.
fn strip_quotes(token: &str) -> &str {
    token
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(token)
}
