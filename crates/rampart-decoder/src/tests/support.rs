//! Shared fixtures for the behaviour suites: a scripted store, a recording
//! dump sink, and canonical event payloads.

use std::io;
use std::sync::{Arc, Mutex};

use serde_json::{Value, json};

use crate::store::{PolicyStore, ResponseCode};
use crate::{DumpSink, ScaDecoder, SendStatus};

pub(crate) const AGENT_ID: &str = "007";
pub(crate) const SOURCE_ROOT: &str = "/event/original";
pub(crate) const AGENT_ID_PATH: &str = "/agent/id";
pub(crate) const FLAG_PATH: &str = "/rampart/sca_decoded";

/// Store double that records every query and replies from a script.
///
/// Replies are matched by substring in registration order, so more specific
/// needles must be registered first. Unmatched queries get a bare `ok`,
/// which satisfies write verbs and classifies as an error for searches.
pub(crate) struct ScriptedStore {
    pub queries: Vec<String>,
    rules: Vec<(String, ResponseCode, Option<String>)>,
}

impl ScriptedStore {
    pub(crate) fn new() -> Self {
        Self {
            queries: Vec::new(),
            rules: Vec::new(),
        }
    }

    /// Registers a scripted reply for queries containing `needle`.
    pub(crate) fn reply(mut self, needle: &str, code: ResponseCode, payload: &str) -> Self {
        self.rules
            .push((needle.to_string(), code, Some(payload.to_string())));
        self
    }

    /// Returns the verb of each recorded query, in issue order.
    pub(crate) fn verbs(&self) -> Vec<String> {
        self.queries
            .iter()
            .filter_map(|query| query.split_whitespace().nth(3))
            .map(str::to_string)
            .collect()
    }
}

impl PolicyStore for ScriptedStore {
    fn query(&mut self, query: &str) -> (ResponseCode, Option<String>) {
        self.queries.push(query.to_string());
        for (needle, code, payload) in &self.rules {
            if query.contains(needle.as_str()) {
                return (*code, payload.clone());
            }
        }
        (ResponseCode::Ok, Some(String::new()))
    }
}

/// Dump sink double recording every message.
pub(crate) struct RecordingSink {
    pub messages: Vec<String>,
    pub connected: bool,
    pub fail_connect: bool,
    pub send_status: SendStatus,
}

impl RecordingSink {
    pub(crate) fn new() -> Self {
        Self {
            messages: Vec::new(),
            connected: false,
            fail_connect: false,
            send_status: SendStatus::Success,
        }
    }
}

impl DumpSink for RecordingSink {
    fn is_connected(&self) -> bool {
        self.connected
    }

    fn connect(&mut self) -> io::Result<()> {
        if self.fail_connect {
            return Err(io::Error::new(io::ErrorKind::NotFound, "no sink"));
        }
        self.connected = true;
        Ok(())
    }

    fn send(&mut self, message: &str) -> SendStatus {
        self.messages.push(message.to_string());
        self.send_status
    }

    fn disconnect(&mut self) {
        self.connected = false;
    }
}

pub(crate) type TestDecoder = ScaDecoder<ScriptedStore, RecordingSink>;

/// Builds a decoder over the given doubles, returning handles for later
/// inspection.
pub(crate) fn decoder(
    store: ScriptedStore,
    sink: RecordingSink,
) -> (
    Arc<Mutex<ScriptedStore>>,
    Arc<Mutex<RecordingSink>>,
    TestDecoder,
) {
    let store = Arc::new(Mutex::new(store));
    let sink = Arc::new(Mutex::new(sink));
    let decoder = ScaDecoder::new(
        SOURCE_ROOT,
        AGENT_ID_PATH,
        FLAG_PATH,
        Arc::clone(&store),
        Arc::clone(&sink),
    );
    (store, sink, decoder)
}

/// Wraps an SCA payload the way the engine delivers it.
pub(crate) fn wrap(payload: Value) -> Value {
    json!({
        "event": {"original": payload},
        "agent": {"id": AGENT_ID},
    })
}

/// Canonical `check` event: check 42 of policy `cis_debian9`, result passed.
pub(crate) fn check_event() -> Value {
    wrap(json!({
        "type": "check",
        "id": 1,
        "policy": "CIS Debian 9 Benchmark",
        "policy_id": "cis_debian9",
        "check": {
            "id": 42,
            "title": "Ensure mounting of cramfs is disabled",
            "result": "passed",
        },
    }))
}

/// Canonical `summary` event closing scan 7 of policy `cis_debian9`.
pub(crate) fn summary_event() -> Value {
    wrap(json!({
        "type": "summary",
        "scan_id": 7,
        "policy_id": "cis_debian9",
        "name": "CIS Debian 9 Benchmark",
        "file": "cis_debian9.yml",
        "description": "Best practices for Debian 9",
        "references": "https://www.cisecurity.org",
        "start_time": 100,
        "end_time": 200,
        "passed": 10,
        "failed": 2,
        "invalid": 1,
        "total_checks": 13,
        "score": 85,
        "hash": "H",
        "hash_file": "FH",
    }))
}

/// Canonical `policies` event reporting the given policy identifiers.
pub(crate) fn policies_event(policies: &[&str]) -> Value {
    wrap(json!({
        "type": "policies",
        "policies": policies,
    }))
}

/// Canonical `dump_end` event for scan 7 of policy `cis_debian9`.
pub(crate) fn dump_event() -> Value {
    wrap(json!({
        "type": "dump_end",
        "elements_sent": 13,
        "policy_id": "cis_debian9",
        "scan_id": 7,
    }))
}

/// Mutable access to the wrapped SCA payload.
pub(crate) fn payload_mut(event: &mut Value) -> &mut Value {
    &mut event["event"]["original"]
}

/// Reads the decode verdict recorded on the event.
pub(crate) fn decoded_flag(event: &Value) -> Option<bool> {
    event.pointer(FLAG_PATH).and_then(Value::as_bool)
}

/// Reads the normalized output subtree, if any was written.
pub(crate) fn sca(event: &Value) -> Option<&Value> {
    event.pointer("/sca")
}
