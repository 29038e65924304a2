//! Error types for decoder failures.
//!
//! Every variant corresponds to a rejection the dispatcher reports as the
//! event's failure trace. Decoder failures never escape as panics; the
//! dispatcher converts them into a `false` decode verdict on the event.

use thiserror::Error;

/// Errors surfaced while decoding one SCA event.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The event lacks the configured payload prefix or agent identifier.
    #[error("event path '{path}' not found or not usable")]
    ContextNotFound { path: String },

    /// The payload's `/type` field is missing or not a string.
    #[error("event type at '{path}' is missing or not a string")]
    MissingType { path: String },

    /// The payload's `/type` value names no known event kind.
    #[error("unknown event type '{kind}'")]
    UnknownType { kind: String },

    /// The payload failed the event kind's schema validation.
    #[error("invalid {kind} event")]
    InvalidEvent { kind: &'static str },

    /// A reconciliation query against the store failed with no safe default.
    #[error("store query '{verb}' failed for agent '{agent_id}'")]
    StoreQuery {
        verb: &'static str,
        agent_id: String,
    },

    /// Shared client state was unusable (e.g. a poisoned lock).
    #[error("internal decoder error: {message}")]
    Internal { message: String },
}

impl DecodeError {
    /// Creates a missing-context error for the given pointer.
    pub fn context_not_found(path: impl Into<String>) -> Self {
        Self::ContextNotFound { path: path.into() }
    }

    /// Creates a missing-type error for the given pointer.
    pub fn missing_type(path: impl Into<String>) -> Self {
        Self::MissingType { path: path.into() }
    }

    /// Creates an unknown-type error.
    pub fn unknown_type(kind: impl Into<String>) -> Self {
        Self::UnknownType { kind: kind.into() }
    }

    /// Creates a schema-validation error for the given event kind.
    pub fn invalid_event(kind: &'static str) -> Self {
        Self::InvalidEvent { kind }
    }

    /// Creates a store-query error.
    pub fn store_query(verb: &'static str, agent_id: impl Into<String>) -> Self {
        Self::StoreQuery {
            verb,
            agent_id: agent_id.into(),
        }
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}
