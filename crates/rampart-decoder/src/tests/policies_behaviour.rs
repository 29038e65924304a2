//! Behaviour of `policies` event decoding.

use serde_json::json;

use crate::store::ResponseCode;

use super::support::{RecordingSink, ScriptedStore, decoded_flag, decoder, payload_mut, policies_event};

#[test]
fn stale_policies_are_deleted() {
    let store =
        ScriptedStore::new().reply("query_policies", ResponseCode::Ok, "found cis_debian9,pci,old");
    let (store, _sink, decoder) = decoder(store, RecordingSink::new());
    let mut event = policies_event(&["cis_debian9", "pci"]);

    let outcome = decoder.decode(&mut event);

    assert!(outcome.is_accepted());
    assert_eq!(decoded_flag(&event), Some(true));
    let store = store.lock().expect("store");
    assert_eq!(
        store.queries,
        [
            "agent 007 sca query_policies",
            "agent 007 sca delete_policy old",
            "agent 007 sca delete_check old",
        ]
    );
}

#[test]
fn an_empty_report_touches_nothing() {
    let store = ScriptedStore::new();
    let (store, _sink, decoder) = decoder(store, RecordingSink::new());
    let mut event = policies_event(&[]);

    let outcome = decoder.decode(&mut event);

    assert!(outcome.is_accepted());
    assert!(store.lock().expect("store").queries.is_empty());
}

#[test]
fn enumeration_failure_keeps_the_event_and_deletes_nothing() {
    let store = ScriptedStore::new().reply("query_policies", ResponseCode::Error, "");
    let (store, _sink, decoder) = decoder(store, RecordingSink::new());
    let mut event = policies_event(&["cis_debian9"]);

    let outcome = decoder.decode(&mut event);

    assert!(outcome.is_accepted());
    assert_eq!(decoded_flag(&event), Some(true));
    assert_eq!(store.lock().expect("store").verbs(), ["query_policies"]);
}

#[test]
fn deletion_failures_do_not_fail_the_event() {
    let store = ScriptedStore::new()
        .reply("query_policies", ResponseCode::Ok, "found gone")
        .reply("delete_policy", ResponseCode::Error, "");
    let (store, _sink, decoder) = decoder(store, RecordingSink::new());
    let mut event = policies_event(&["cis_debian9"]);

    let outcome = decoder.decode(&mut event);

    assert!(outcome.is_accepted());
    // The failed policy delete stops the per-policy cleanup early.
    assert_eq!(
        store.lock().expect("store").verbs(),
        ["query_policies", "delete_policy"]
    );
}

#[test]
fn a_non_array_policies_field_is_rejected() {
    let store = ScriptedStore::new();
    let (store, _sink, decoder) = decoder(store, RecordingSink::new());
    let mut event = policies_event(&[]);
    payload_mut(&mut event)["policies"] = json!("cis_debian9");

    let outcome = decoder.decode(&mut event);

    assert!(!outcome.is_accepted());
    assert_eq!(decoded_flag(&event), Some(false));
    assert!(store.lock().expect("store").queries.is_empty());
}
