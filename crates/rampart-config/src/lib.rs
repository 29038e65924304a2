//! Shared configuration types for the Rampart SCA decoder.
//!
//! The enclosing engine owns configuration *loading* (files, environment,
//! CLI layering); this crate defines the types that loading deserializes
//! into, together with sensible defaults and fail-fast validation. Both the
//! decoder and the engine depend on these types so they agree on socket
//! locations and on the JSON-pointer wiring of the decoder stage.

mod defaults;
mod socket;

pub use defaults::{
    DEFAULT_AGENT_ID_PATH, DEFAULT_DECODED_FLAG_PATH, DEFAULT_EVENT_PREFIX, DEFAULT_LOG_FILTER,
    DEFAULT_STORE_TCP_PORT, default_dump_socket, default_log_filter_string, default_log_format,
    default_store_endpoint,
};
pub use socket::{SocketEndpoint, SocketParseError};

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;

/// Output encoding of decoder telemetry.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LogFormat {
    /// One JSON object per line, for log shippers.
    #[default]
    Json,
    /// Single-line human-readable output for interactive runs.
    Compact,
}

impl LogFormat {
    /// True when output is machine-parseable JSON.
    #[must_use]
    pub const fn is_json(self) -> bool {
        matches!(self, Self::Json)
    }
}

/// Configuration for one decoder stage.
///
/// The pointer fields wire the stage into the engine's event documents: the
/// prefix under which the agent's SCA payload arrives, the path holding the
/// reporting agent's identifier, and the path receiving the decode verdict.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// JSON-pointer prefix of the agent event payload.
    pub event_prefix: String,
    /// JSON-pointer path of the reporting agent's identifier.
    pub agent_id_path: String,
    /// JSON-pointer path receiving the boolean decode verdict.
    pub decoded_flag_path: String,
    /// Endpoint of the policy-monitoring store.
    pub store_socket: SocketEndpoint,
    /// Path of the dump-request forwarder's datagram socket.
    pub dump_socket: Utf8PathBuf,
    /// Log filter expression (`tracing` EnvFilter syntax).
    pub log_filter: String,
    /// Log output format.
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            event_prefix: DEFAULT_EVENT_PREFIX.to_string(),
            agent_id_path: DEFAULT_AGENT_ID_PATH.to_string(),
            decoded_flag_path: DEFAULT_DECODED_FLAG_PATH.to_string(),
            store_socket: default_store_endpoint(),
            dump_socket: default_dump_socket(),
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Validates that the configuration is internally consistent.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] naming the first offending field: pointer
    /// fields must be non-empty, rooted at `/`, and free of trailing
    /// slashes; the dump socket path must be non-empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_pointer("event_prefix", &self.event_prefix)?;
        validate_pointer("agent_id_path", &self.agent_id_path)?;
        validate_pointer("decoded_flag_path", &self.decoded_flag_path)?;
        if self.dump_socket.as_str().is_empty() {
            return Err(ConfigError::EmptyDumpSocket);
        }
        Ok(())
    }
}

fn validate_pointer(field: &'static str, pointer: &str) -> Result<(), ConfigError> {
    if pointer.is_empty() {
        return Err(ConfigError::EmptyPointer { field });
    }
    if !pointer.starts_with('/') {
        return Err(ConfigError::UnrootedPointer {
            field,
            pointer: pointer.to_string(),
        });
    }
    if pointer.ends_with('/') {
        return Err(ConfigError::TrailingSlash {
            field,
            pointer: pointer.to_string(),
        });
    }
    Ok(())
}

/// Errors raised while validating a [`Config`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A pointer field was empty.
    #[error("{field} must not be empty")]
    EmptyPointer { field: &'static str },
    /// A pointer field did not start with `/`.
    #[error("{field} '{pointer}' must be a rooted JSON pointer")]
    UnrootedPointer { field: &'static str, pointer: String },
    /// A pointer field ended with `/`, which denotes an empty trailing token.
    #[error("{field} '{pointer}' must not end with '/'")]
    TrailingSlash { field: &'static str, pointer: String },
    /// The dump socket path was empty.
    #[error("dump_socket must not be empty")]
    EmptyDumpSocket,
}
