//! Security Configuration Assessment event decoder.
//!
//! Remote agents run periodic compliance scans and report their findings as
//! JSON events. This crate decodes those events: it validates each payload,
//! reconciles it against the per-agent policy-monitoring store, materializes
//! a normalized view under the `/sca` prefix for downstream alerting, and
//! asks the agent to re-send its full result set whenever the store's
//! integrity hashes diverge from what the agent reports.
//!
//! The protocol knows four event kinds, each with its own schema and store
//! contract:
//!
//! - `check` — the outcome of one compliance test,
//! - `summary` — counters and integrity hashes closing one scan,
//! - `policies` — the set of policies the agent currently scans,
//! - `dump_end` — the end marker of a requested re-synchronization dump.
//!
//! [`ScaDecoder`] is built once per configured rule and invoked per event.
//! It holds no state of its own between invocations; everything durable
//! lives in the store. The store and forwarder clients are shared handles
//! whose access the enclosing engine serializes — the decoder performs no
//! internal parallelism.

mod context;
mod dispatch;
mod errors;
mod event;
mod field;
mod forwarder;
mod handlers;
mod store;
pub mod telemetry;
mod validate;

pub use context::DecodeContext;
pub use dispatch::{DecodeOutcome, EventKind, ScaDecoder};
pub use errors::DecodeError;
pub use event::EventDoc;
pub use field::{DEST_ROOT, Field, FieldPaths};
pub use forwarder::{DumpForwarder, DumpSink, SendStatus, push_dump_request};
pub use store::{PolicyStore, ResponseCode, SearchResult, StoreClient, search};
pub use validate::{Condition, FieldKind, is_valid_event};

#[cfg(test)]
mod tests;
