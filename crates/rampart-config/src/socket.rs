//! Store endpoint addressing.
//!
//! The policy-monitoring store listens on a Unix domain socket in
//! production; TCP covers containerised development setups where the store
//! sits behind a forwarded port. An endpoint is written as one
//! configuration string: a bare absolute path, a `unix://` locator, or a
//! `tcp://host:port` locator, and serializes back to that same string.

use std::fmt;
use std::str::FromStr;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Address of a stream socket the decoder dials.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub enum SocketEndpoint {
    /// Unix domain socket at the given path.
    Unix { path: Utf8PathBuf },
    /// TCP socket at the given host and port.
    Tcp { host: String, port: u16 },
}

impl SocketEndpoint {
    /// Builds an endpoint for a Unix socket path.
    #[must_use]
    pub fn unix(path: impl Into<Utf8PathBuf>) -> Self {
        Self::Unix { path: path.into() }
    }

    /// Builds a TCP endpoint.
    #[must_use]
    pub fn tcp(host: impl Into<String>, port: u16) -> Self {
        Self::Tcp {
            host: host.into(),
            port,
        }
    }

    /// Returns the socket path of a Unix endpoint.
    #[must_use]
    pub fn unix_path(&self) -> Option<&Utf8Path> {
        if let Self::Unix { path } = self {
            Some(path.as_ref())
        } else {
            None
        }
    }
}

impl fmt::Display for SocketEndpoint {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unix { path } => write!(formatter, "unix://{path}"),
            Self::Tcp { host, port } => write!(formatter, "tcp://{host}:{port}"),
        }
    }
}

impl FromStr for SocketEndpoint {
    type Err = SocketParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        if let Some(path) = input.strip_prefix("unix://") {
            return if path.is_empty() {
                Err(SocketParseError::EmptyUnixPath(input.to_string()))
            } else {
                Ok(Self::unix(path))
            };
        }

        // A bare absolute path is shorthand for a unix endpoint, matching
        // how engine configurations name the store socket.
        if input.starts_with('/') {
            return Ok(Self::unix(input));
        }

        if input.starts_with("tcp://") {
            return parse_tcp(input);
        }

        Err(SocketParseError::UnknownScheme(input.to_string()))
    }
}

/// Splits host and port out of a `tcp://` locator.
///
/// Delegating to `url` keeps IPv6 literals and other host syntax behaving
/// like every other locator the engine accepts.
fn parse_tcp(input: &str) -> Result<SocketEndpoint, SocketParseError> {
    let url = Url::parse(input).map_err(|source| SocketParseError::InvalidTcp {
        endpoint: input.to_string(),
        source,
    })?;
    match (url.host_str(), url.port()) {
        (Some(host), Some(port)) => Ok(SocketEndpoint::tcp(host, port)),
        (None, _) => Err(SocketParseError::MissingHost(input.to_string())),
        (Some(_), None) => Err(SocketParseError::MissingPort(input.to_string())),
    }
}

impl TryFrom<String> for SocketEndpoint {
    type Error = SocketParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SocketEndpoint> for String {
    fn from(endpoint: SocketEndpoint) -> Self {
        endpoint.to_string()
    }
}

/// Errors from parsing an endpoint string.
#[derive(Debug, Error)]
pub enum SocketParseError {
    /// A `unix://` locator carried no path.
    #[error("unix endpoint '{0}' has an empty socket path")]
    EmptyUnixPath(String),
    /// A `tcp://` locator did not parse.
    #[error("endpoint '{endpoint}' is not a valid tcp locator: {source}")]
    InvalidTcp {
        endpoint: String,
        #[source]
        source: url::ParseError,
    },
    /// A `tcp://` locator had no host.
    #[error("tcp endpoint '{0}' has no host")]
    MissingHost(String),
    /// A `tcp://` locator had no port; the store has no well-known one.
    #[error("tcp endpoint '{0}' needs an explicit port")]
    MissingPort(String),
    /// The value is neither a socket path nor a known locator.
    #[error("endpoint '{0}' is neither a socket path nor a unix:// or tcp:// locator")]
    UnknownScheme(String),
}
