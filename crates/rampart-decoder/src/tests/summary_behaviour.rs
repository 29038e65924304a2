//! Behaviour of `summary` event decoding.

use serde_json::json;

use crate::store::ResponseCode;

use super::support::{
    RecordingSink, ScriptedStore, decoded_flag, decoder, payload_mut, sca, summary_event,
};

#[test]
fn first_scan_inserts_and_requests_two_dumps() {
    // Nothing is stored yet: scan info, policy, and check results are all
    // missing. The insert path requests a dump, and the empty-results check
    // requests another one for the same policy — the duplication mirrors
    // the store's lenient treatment of repeated dump requests.
    let store = ScriptedStore::new()
        .reply("query_scan", ResponseCode::Ok, "not found")
        .reply("query_policy_sha256", ResponseCode::Ok, "not found")
        .reply("query_policy", ResponseCode::Ok, "not found")
        .reply("query_results", ResponseCode::Ok, "not found");
    let (store, sink, decoder) = decoder(store, RecordingSink::new());
    let mut event = summary_event();
    payload_mut(&mut event)["first_scan"] = json!(1);

    let outcome = decoder.decode(&mut event);

    assert!(outcome.is_accepted());
    assert_eq!(decoded_flag(&event), Some(true));

    let store = store.lock().expect("store");
    assert!(store.queries.contains(
        &"agent 007 sca insert_scan_info 100|200|7|cis_debian9|10|2|1|13|85|H".to_string()
    ));
    assert!(store.queries.contains(
        &"agent 007 sca insert_policy CIS Debian 9 Benchmark|cis_debian9.yml|cis_debian9|\
          Best practices for Debian 9|https://www.cisecurity.org|FH"
            .to_string()
    ));

    let sink = sink.lock().expect("sink");
    assert_eq!(
        sink.messages,
        ["007:sca-dump:cis_debian9:1", "007:sca-dump:cis_debian9:1"]
    );

    // A fresh policy always normalizes.
    assert_eq!(event.pointer("/sca/type"), Some(&json!("summary")));
    assert_eq!(
        event.pointer("/sca/policy"),
        Some(&json!("CIS Debian 9 Benchmark"))
    );
    assert_eq!(event.pointer("/sca/total_checks"), Some(&json!(13)));
}

#[test]
fn matching_hashes_update_quietly() {
    // The stored scan hash matches the event (first whitespace token), the
    // policy file hash matches, and the check results hash matches: update
    // in place, no normalization, no dump.
    let store = ScriptedStore::new()
        .reply("query_scan", ResponseCode::Ok, "found H foo")
        .reply("query_policy_sha256", ResponseCode::Ok, "found FH")
        .reply("query_policy", ResponseCode::Ok, "found ")
        .reply("query_results", ResponseCode::Ok, "found H");
    let (store, sink, decoder) = decoder(store, RecordingSink::new());
    let mut event = summary_event();

    let outcome = decoder.decode(&mut event);

    assert!(outcome.is_accepted());
    let store = store.lock().expect("store");
    assert!(store.queries.contains(
        &"agent 007 sca update_scan_info_start cis_debian9|100|200|7|10|2|1|13|85|H".to_string()
    ));
    assert!(!store.queries.iter().any(|q| q.contains("delete_policy")));
    assert!(sca(&event).is_none());
    assert!(sink.lock().expect("sink").messages.is_empty());
}

#[test]
fn changed_scan_hash_normalizes_and_requests_a_dump() {
    let store = ScriptedStore::new()
        .reply("query_scan", ResponseCode::Ok, "found OLD foo")
        .reply("query_policy_sha256", ResponseCode::Ok, "found FH")
        .reply("query_policy", ResponseCode::Ok, "found ")
        .reply("query_results", ResponseCode::Ok, "found OLD");
    let (_store, sink, decoder) = decoder(store, RecordingSink::new());
    let mut event = summary_event();

    let outcome = decoder.decode(&mut event);

    assert!(outcome.is_accepted());
    assert_eq!(event.pointer("/sca/type"), Some(&json!("summary")));
    // Not a first scan, so the divergence dump carries a zero flag.
    assert_eq!(
        sink.lock().expect("sink").messages,
        ["007:sca-dump:cis_debian9:0"]
    );
}

#[test]
fn force_alert_normalizes_even_when_hashes_match() {
    let store = ScriptedStore::new()
        .reply("query_scan", ResponseCode::Ok, "found H")
        .reply("query_policy_sha256", ResponseCode::Ok, "found FH")
        .reply("query_policy", ResponseCode::Ok, "found ")
        .reply("query_results", ResponseCode::Ok, "found H");
    let (_store, sink, decoder) = decoder(store, RecordingSink::new());
    let mut event = summary_event();
    payload_mut(&mut event)["force_alert"] = json!("1");

    let outcome = decoder.decode(&mut event);

    assert!(outcome.is_accepted());
    assert_eq!(event.pointer("/sca/type"), Some(&json!("summary")));
    assert!(sink.lock().expect("sink").messages.is_empty());
}

#[test]
fn changed_policy_file_hash_resets_the_policy() {
    // The agent runs a different revision of the policy file: the stored
    // policy and checks are dropped and a first-scan dump rebuilds them.
    let store = ScriptedStore::new()
        .reply("query_scan", ResponseCode::Ok, "found H")
        .reply("query_policy_sha256", ResponseCode::Ok, "found STALE")
        .reply("query_policy", ResponseCode::Ok, "found ")
        .reply("query_results", ResponseCode::Ok, "found H");
    let (store, sink, decoder) = decoder(store, RecordingSink::new());
    let mut event = summary_event();

    let outcome = decoder.decode(&mut event);

    assert!(outcome.is_accepted());
    let store = store.lock().expect("store");
    assert!(store.queries.contains(&"agent 007 sca delete_policy cis_debian9".to_string()));
    assert!(store.queries.contains(&"agent 007 sca delete_check cis_debian9".to_string()));
    assert_eq!(
        sink.lock().expect("sink").messages,
        ["007:sca-dump:cis_debian9:1"]
    );
}

#[test]
fn failed_policy_delete_skips_the_rebuild_dump() {
    let store = ScriptedStore::new()
        .reply("query_scan", ResponseCode::Ok, "found H")
        .reply("query_policy_sha256", ResponseCode::Ok, "found STALE")
        .reply("query_policy", ResponseCode::Ok, "found ")
        .reply("query_results", ResponseCode::Ok, "found H")
        .reply("delete_policy", ResponseCode::Error, "");
    let (store, sink, decoder) = decoder(store, RecordingSink::new());
    let mut event = summary_event();

    decoder.decode(&mut event);

    let store = store.lock().expect("store");
    // The check delete is skipped once the policy delete fails.
    assert!(!store.queries.iter().any(|q| q.contains("delete_check")));
    assert!(sink.lock().expect("sink").messages.is_empty());
}

#[test]
fn scan_query_error_skips_the_save_but_keeps_reconciling() {
    let store = ScriptedStore::new()
        .reply("query_scan", ResponseCode::Error, "")
        .reply("query_policy_sha256", ResponseCode::Ok, "found FH")
        .reply("query_policy", ResponseCode::Ok, "found ")
        .reply("query_results", ResponseCode::Ok, "found H");
    let (store, sink, decoder) = decoder(store, RecordingSink::new());
    let mut event = summary_event();

    let outcome = decoder.decode(&mut event);

    // The event still succeeds; only the scan-info save block is skipped.
    assert!(outcome.is_accepted());
    assert_eq!(decoded_flag(&event), Some(true));
    let store = store.lock().expect("store");
    assert!(!store.queries.iter().any(|q| q.contains("scan_info")));
    assert!(store.queries.iter().any(|q| q.contains("query_policy")));
    assert!(sca(&event).is_none());
    assert!(sink.lock().expect("sink").messages.is_empty());
}

#[test]
fn missing_counters_reject_the_event() {
    let store = ScriptedStore::new();
    let (store, _sink, decoder) = decoder(store, RecordingSink::new());
    let mut event = summary_event();
    payload_mut(&mut event)
        .as_object_mut()
        .expect("payload")
        .remove("score");

    let outcome = decoder.decode(&mut event);

    assert!(!outcome.is_accepted());
    assert_eq!(decoded_flag(&event), Some(false));
    assert!(store.lock().expect("store").queries.is_empty());
}

#[test]
fn absent_optional_strings_insert_as_null() {
    let store = ScriptedStore::new()
        .reply("query_scan", ResponseCode::Ok, "not found")
        .reply("query_policy_sha256", ResponseCode::Ok, "not found")
        .reply("query_policy", ResponseCode::Ok, "not found")
        .reply("query_results", ResponseCode::Ok, "not found");
    let (store, _sink, decoder) = decoder(store, RecordingSink::new());
    let mut event = summary_event();
    let payload = payload_mut(&mut event).as_object_mut().expect("payload");
    payload.remove("description");
    payload.remove("references");

    let outcome = decoder.decode(&mut event);

    assert!(outcome.is_accepted());
    let store = store.lock().expect("store");
    assert!(store.queries.contains(
        &"agent 007 sca insert_policy CIS Debian 9 Benchmark|cis_debian9.yml|cis_debian9|\
          NULL|NULL|FH"
            .to_string()
    ));
}
