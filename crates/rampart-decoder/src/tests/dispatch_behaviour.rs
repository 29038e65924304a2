//! Behaviour of the dispatcher: context resolution, kind routing, and the
//! decode-verdict contract.

use rstest::rstest;
use serde_json::{Value, json};

use crate::store::ResponseCode;

use super::support::{
    RecordingSink, ScriptedStore, check_event, decoded_flag, decoder, payload_mut, sca, wrap,
};

#[rstest]
#[case::missing_payload(json!({"agent": {"id": "007"}}))]
#[case::missing_agent_id(json!({"event": {"original": {"type": "check"}}}))]
#[case::non_string_agent_id(json!({
    "event": {"original": {"type": "check"}},
    "agent": {"id": 7},
}))]
fn unusable_context_is_rejected_without_store_access(#[case] mut event: Value) {
    let (store, _sink, decoder) = decoder(ScriptedStore::new(), RecordingSink::new());

    let outcome = decoder.decode(&mut event);

    assert!(!outcome.is_accepted());
    assert_eq!(decoded_flag(&event), Some(false));
    assert!(outcome.trace().expect("trace").contains("not found"));
    assert!(store.lock().expect("store").queries.is_empty());
}

#[test]
fn a_missing_type_is_rejected() {
    let (store, _sink, decoder) = decoder(ScriptedStore::new(), RecordingSink::new());
    let mut event = wrap(json!({"policy_id": "cis_debian9"}));

    let outcome = decoder.decode(&mut event);

    assert!(!outcome.is_accepted());
    assert_eq!(decoded_flag(&event), Some(false));
    assert!(store.lock().expect("store").queries.is_empty());
}

#[rstest]
#[case::unknown("scan_started")]
#[case::wrong_case("Check")]
fn an_unknown_type_is_rejected_without_store_access(#[case] kind: &str) {
    let (store, sink, decoder) = decoder(ScriptedStore::new(), RecordingSink::new());
    let mut event = wrap(json!({"type": kind}));

    let outcome = decoder.decode(&mut event);

    assert!(!outcome.is_accepted());
    assert!(outcome.trace().expect("trace").contains("unknown event type"));
    assert!(store.lock().expect("store").queries.is_empty());
    assert!(sink.lock().expect("sink").messages.is_empty());
}

#[test]
fn every_invocation_writes_exactly_one_verdict() {
    let store = ScriptedStore::new().reply("sca query 42", ResponseCode::Ok, "not found");
    let (_store, _sink, decoder) = decoder(store, RecordingSink::new());

    let mut accepted = check_event();
    assert_eq!(decoded_flag(&accepted), None);
    decoder.decode(&mut accepted);
    assert_eq!(decoded_flag(&accepted), Some(true));

    let mut rejected = wrap(json!({"type": "bogus"}));
    decoder.decode(&mut rejected);
    assert_eq!(decoded_flag(&rejected), Some(false));
}

#[test]
fn rejection_leaves_the_payload_untouched_apart_from_the_verdict() {
    let (_store, _sink, decoder) = decoder(ScriptedStore::new(), RecordingSink::new());
    let mut event = wrap(json!({"type": "bogus", "check": {"id": 1}}));
    let pristine = payload_mut(&mut event).clone();

    decoder.decode(&mut event);

    assert_eq!(payload_mut(&mut event).clone(), pristine);
    assert!(sca(&event).is_none());
}

#[test]
fn the_decoder_is_reusable_across_events() {
    let store = ScriptedStore::new().reply("sca query 42", ResponseCode::Ok, "found passed");
    let (store, _sink, decoder) = decoder(store, RecordingSink::new());

    for _ in 0..2 {
        let mut event = check_event();
        let outcome = decoder.decode(&mut event);
        assert!(outcome.is_accepted());
    }

    // No state is carried between invocations: both events ran the same
    // query/update sequence against the shared store.
    assert_eq!(
        store.lock().expect("store").verbs(),
        ["query", "update", "query", "update"]
    );
}

#[test]
fn the_agent_identity_prefixes_every_query() {
    let store = ScriptedStore::new().reply("sca query 42", ResponseCode::Ok, "found passed");
    let (store, _sink, decoder) = decoder(store, RecordingSink::new());
    let mut event = check_event();
    event["agent"]["id"] = json!("1024");

    decoder.decode(&mut event);

    let store = store.lock().expect("store");
    assert!(store.queries.iter().all(|q| q.starts_with("agent 1024 sca ")));
}
