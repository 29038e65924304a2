//! Event dispatch for the SCA decoder.
//!
//! [`ScaDecoder`] is built once per configured rule: it binds the source and
//! destination path maps, the decoded-flag pointer, and shared handles to
//! the store and forwarder clients. Each invocation reads the payload's
//! `/type`, routes to the matching handler, and records the verdict on the
//! event — exactly one of `true` or `false` lands at the decoded-flag
//! pointer per invocation.

use std::sync::{Arc, Mutex};

use serde_json::Value;
use tracing::debug;

use rampart_config::Config;

use crate::context::DecodeContext;
use crate::errors::DecodeError;
use crate::event::EventDoc;
use crate::field::{DEST_ROOT, Field, FieldPaths};
use crate::forwarder::{DumpForwarder, DumpSink};
use crate::handlers::{DECODE_TARGET, check, dump, policies, summary};
use crate::store::{PolicyStore, StoreClient};

/// The four event kinds of the SCA protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Outcome of one compliance test.
    Check,
    /// Scan-closing counters and integrity hashes.
    Summary,
    /// Enumeration of the policies the agent scans.
    Policies,
    /// End marker of a requested re-synchronization dump.
    DumpEnd,
}

impl EventKind {
    /// Parses the payload's `type` value.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            check::KIND => Some(Self::Check),
            summary::KIND => Some(Self::Summary),
            policies::KIND => Some(Self::Policies),
            dump::KIND => Some(Self::DumpEnd),
            _ => None,
        }
    }

    /// Returns the canonical wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Check => check::KIND,
            Self::Summary => summary::KIND,
            Self::Policies => policies::KIND,
            Self::DumpEnd => dump::KIND,
        }
    }
}

/// Verdict of one decoder invocation.
#[derive(Debug)]
pub struct DecodeOutcome {
    accepted: bool,
    trace: Option<String>,
}

impl DecodeOutcome {
    fn accepted() -> Self {
        Self {
            accepted: true,
            trace: None,
        }
    }

    fn rejected(trace: String) -> Self {
        Self {
            accepted: false,
            trace: Some(trace),
        }
    }

    /// Returns true when the event was decoded.
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        self.accepted
    }

    /// Returns the failure trace of a rejected event.
    #[must_use]
    pub fn trace(&self) -> Option<&str> {
        self.trace.as_deref()
    }
}

/// Stateful SCA event decoder.
///
/// All durable state lives in the store; the decoder itself only carries
/// wiring. The client handles are shared with other decoder instances and
/// with reconnection handled inside the clients, so the decoder never
/// manages connections directly.
pub struct ScaDecoder<S, F> {
    source_root: String,
    agent_id_path: String,
    decoded_flag_path: String,
    source: FieldPaths,
    dest: FieldPaths,
    store: Arc<Mutex<S>>,
    forwarder: Arc<Mutex<F>>,
}

impl<S: PolicyStore, F: DumpSink> ScaDecoder<S, F> {
    /// Builds a decoder binding the given pointers and client handles.
    ///
    /// Source paths for every registered field are rooted at `source_root`;
    /// destination paths are rooted at `/sca`.
    #[must_use]
    pub fn new(
        source_root: impl Into<String>,
        agent_id_path: impl Into<String>,
        decoded_flag_path: impl Into<String>,
        store: Arc<Mutex<S>>,
        forwarder: Arc<Mutex<F>>,
    ) -> Self {
        let source_root = source_root.into();
        let source = FieldPaths::rooted(&source_root);
        let dest = FieldPaths::rooted(DEST_ROOT);
        Self {
            source_root,
            agent_id_path: agent_id_path.into(),
            decoded_flag_path: decoded_flag_path.into(),
            source,
            dest,
            store,
            forwarder,
        }
    }

    /// Builds a decoder wired according to the given configuration.
    #[must_use]
    pub fn from_config(config: &Config, store: Arc<Mutex<S>>, forwarder: Arc<Mutex<F>>) -> Self {
        Self::new(
            config.event_prefix.clone(),
            config.agent_id_path.clone(),
            config.decoded_flag_path.clone(),
            store,
            forwarder,
        )
    }

    /// Decodes one event, recording the verdict on the document.
    pub fn decode(&self, event: &mut Value) -> DecodeOutcome {
        let result = self.run(event);
        let mut doc = EventDoc::new(event);
        match result {
            Ok(()) => {
                doc.set_bool(true, &self.decoded_flag_path);
                DecodeOutcome::accepted()
            }
            Err(error) => {
                doc.set_bool(false, &self.decoded_flag_path);
                debug!(
                    target: DECODE_TARGET,
                    error = %error,
                    "event rejected"
                );
                DecodeOutcome::rejected(error.to_string())
            }
        }
    }

    fn run(&self, event: &mut Value) -> Result<(), DecodeError> {
        let (agent_id, kind) = {
            let doc = EventDoc::new(event);
            if !doc.exists(&self.source_root) {
                return Err(DecodeError::context_not_found(&self.source_root));
            }
            let agent_id = doc
                .get_str(&self.agent_id_path)
                .map(str::to_string)
                .ok_or_else(|| DecodeError::context_not_found(&self.agent_id_path))?;

            let type_path = self.source.path(Field::Type);
            let kind_value = doc
                .get_str(type_path)
                .ok_or_else(|| DecodeError::missing_type(type_path))?;
            let kind =
                EventKind::parse(kind_value).ok_or_else(|| DecodeError::unknown_type(kind_value))?;
            (agent_id, kind)
        };

        let mut store = self
            .store
            .lock()
            .map_err(|_| DecodeError::internal("store lock poisoned"))?;
        let mut forwarder = self
            .forwarder
            .lock()
            .map_err(|_| DecodeError::internal("forwarder lock poisoned"))?;

        let mut ctx = DecodeContext {
            event: EventDoc::new(event),
            agent_id,
            store: &mut *store,
            forwarder: &mut *forwarder,
            source: &self.source,
            dest: &self.dest,
        };

        match kind {
            EventKind::Check => check::handle(&mut ctx),
            EventKind::Summary => summary::handle(&mut ctx),
            EventKind::Policies => policies::handle(&mut ctx),
            EventKind::DumpEnd => dump::handle(&mut ctx),
        }
    }
}

impl ScaDecoder<StoreClient, DumpForwarder> {
    /// Builds a decoder with freshly created clients for the configured
    /// sockets. Both clients connect lazily on first use.
    #[must_use]
    pub fn connect(config: &Config) -> Self {
        let store = Arc::new(Mutex::new(StoreClient::new(config.store_socket.clone())));
        let forwarder = Arc::new(Mutex::new(DumpForwarder::new(config.dump_socket.clone())));
        Self::from_config(config, store, forwarder)
    }
}
