//! Handler for `summary` events.
//!
//! A summary closes one scan of a policy: it carries the scan counters and
//! two integrity hashes (the check-results hash and the policy-file hash).
//! The handler persists the scan info, reconciles both hashes against the
//! store, keeps the policy table in sync, and requests a dump from the
//! agent whenever the store has diverged from what the agent reports.

use tracing::{debug, warn};

use crate::context::DecodeContext;
use crate::errors::DecodeError;
use crate::field::Field;
use crate::forwarder::{DumpSink, push_dump_request};
use crate::store::{PolicyStore, ResponseCode, SearchResult, search};
use crate::validate::{Condition, FieldKind, is_valid_event};

use super::{DECODE_TARGET, delete_policy_and_check, find_check_results};

pub(crate) const KIND: &str = "summary";

const SCHEMA: [Condition; 15] = [
    Condition::required(Field::PolicyId, FieldKind::String),
    Condition::required(Field::ScanId, FieldKind::Int),
    Condition::required(Field::StartTime, FieldKind::Int),
    Condition::required(Field::EndTime, FieldKind::Int),
    Condition::required(Field::Passed, FieldKind::Int),
    Condition::required(Field::Failed, FieldKind::Int),
    Condition::required(Field::Invalid, FieldKind::Int),
    Condition::required(Field::TotalChecks, FieldKind::Int),
    Condition::required(Field::Score, FieldKind::Int),
    Condition::required(Field::Hash, FieldKind::String),
    Condition::required(Field::HashFile, FieldKind::String),
    Condition::required(Field::File, FieldKind::String),
    Condition::optional(Field::Description, FieldKind::String),
    Condition::optional(Field::References, FieldKind::String),
    Condition::required(Field::Name, FieldKind::String),
];

/// Scan counters and hashes extracted from a validated summary event.
///
/// `FIRST_SCAN` and `FORCE_ALERT` are existence-only sentinels; their
/// values are never read.
struct ScanSummary {
    policy_id: String,
    scan_id: i64,
    start_time: i64,
    end_time: i64,
    passed: i64,
    failed: i64,
    invalid: i64,
    total_checks: i64,
    score: i64,
    hash: String,
}

fn extract<S: ?Sized, F: ?Sized>(ctx: &DecodeContext<'_, S, F>) -> Option<ScanSummary> {
    Some(ScanSummary {
        policy_id: ctx.src_str(Field::PolicyId)?,
        scan_id: ctx.src_int(Field::ScanId)?,
        start_time: ctx.src_int(Field::StartTime)?,
        end_time: ctx.src_int(Field::EndTime)?,
        passed: ctx.src_int(Field::Passed)?,
        failed: ctx.src_int(Field::Failed)?,
        invalid: ctx.src_int(Field::Invalid)?,
        total_checks: ctx.src_int(Field::TotalChecks)?,
        score: ctx.src_int(Field::Score)?,
        hash: ctx.src_str(Field::Hash)?,
    })
}

/// Processes one `summary` event.
pub fn handle<S: PolicyStore + ?Sized, F: DumpSink + ?Sized>(
    ctx: &mut DecodeContext<'_, S, F>,
) -> Result<(), DecodeError> {
    if !is_valid_event(ctx, &SCHEMA) {
        warn!(
            target: DECODE_TARGET,
            agent_id = %ctx.agent_id,
            "discarding malformed summary event"
        );
        return Err(DecodeError::invalid_event(KIND));
    }
    let summary = extract(ctx).ok_or_else(|| DecodeError::invalid_event(KIND))?;
    let first_scan = ctx.exists_src(Field::FirstScan);

    let query = format!("agent {} sca query_scan {}", ctx.agent_id, summary.policy_id);
    let (scan_result, scan_info) = search(ctx.store, &query, true);

    let mut normalize = false;
    let mut scan_info_update = false;
    match scan_result {
        SearchResult::Found => {
            scan_info_update = true;
            // The stored hash is the payload's first whitespace token.
            let stored_hash = scan_info.split(' ').next().unwrap_or_default();
            let changed = stored_hash != summary.hash && !first_scan;
            let force_alert = ctx.exists_src(Field::ForceAlert);
            normalize = changed || force_alert;
        }
        SearchResult::NotFound => {
            normalize = true;
        }
        SearchResult::Error => {
            warn!(
                target: DECODE_TARGET,
                agent_id = %ctx.agent_id,
                policy_id = %summary.policy_id,
                "cannot query scan info"
            );
        }
    }

    if scan_result != SearchResult::Error && save_scan_info(ctx, &summary, scan_info_update) {
        if normalize {
            fill_scan_info(ctx);
        }

        if !scan_info_update && first_scan {
            push_dump_request(ctx.forwarder, &ctx.agent_id, &summary.policy_id, first_scan);
        }
    }

    let query = format!(
        "agent {} sca query_policy {}",
        ctx.agent_id, summary.policy_id
    );
    let (policy_result, _) = search(ctx.store, &query, false);
    match policy_result {
        SearchResult::Found => update_policy_info(ctx, &summary.policy_id),
        SearchResult::NotFound => insert_policy_info(ctx),
        SearchResult::Error => {
            warn!(
                target: DECODE_TARGET,
                agent_id = %ctx.agent_id,
                policy_id = %summary.policy_id,
                "cannot query policy"
            );
        }
    }

    check_results_and_dump(ctx, &summary.policy_id, first_scan, &summary.hash);

    Ok(())
}

/// Persists the scan info, updating or inserting as directed.
///
/// Returns false when the store rejects the write; callers skip the
/// dependent normalization and dump steps in that case.
fn save_scan_info<S: PolicyStore + ?Sized, F: ?Sized>(
    ctx: &mut DecodeContext<'_, S, F>,
    summary: &ScanSummary,
    update: bool,
) -> bool {
    let query = if update {
        format!(
            "agent {} sca update_scan_info_start {}|{}|{}|{}|{}|{}|{}|{}|{}|{}",
            ctx.agent_id,
            summary.policy_id,
            summary.start_time,
            summary.end_time,
            summary.scan_id,
            summary.passed,
            summary.failed,
            summary.invalid,
            summary.total_checks,
            summary.score,
            summary.hash,
        )
    } else {
        format!(
            "agent {} sca insert_scan_info {}|{}|{}|{}|{}|{}|{}|{}|{}|{}",
            ctx.agent_id,
            summary.start_time,
            summary.end_time,
            summary.scan_id,
            summary.policy_id,
            summary.passed,
            summary.failed,
            summary.invalid,
            summary.total_checks,
            summary.score,
            summary.hash,
        )
    };

    let (code, _) = ctx.store.query(&query);
    if code != ResponseCode::Ok {
        warn!(
            target: DECODE_TARGET,
            agent_id = %ctx.agent_id,
            policy_id = %summary.policy_id,
            "failed to save scan info"
        );
        return false;
    }

    true
}

/// Materializes the summary under the destination prefix.
fn fill_scan_info<S: ?Sized, F: ?Sized>(ctx: &mut DecodeContext<'_, S, F>) {
    ctx.set_dst_string(KIND, Field::Type);

    // The policy's display name travels as /name and lands as /policy.
    let src = ctx.src(Field::Name).to_string();
    let dst = ctx.dst(Field::Policy).to_string();
    ctx.event.copy(&dst, &src);

    ctx.copy_if_exists(Field::ScanId);
    ctx.copy_if_exists(Field::Description);
    ctx.copy_if_exists(Field::PolicyId);
    ctx.copy_if_exists(Field::Passed);
    ctx.copy_if_exists(Field::Failed);
    ctx.copy_if_exists(Field::Invalid);
    ctx.copy_if_exists(Field::TotalChecks);
    ctx.copy_if_exists(Field::Score);
    ctx.copy_if_exists(Field::File);
}

/// Inserts the policy row, substituting `NULL` for absent strings.
fn insert_policy_info<S: PolicyStore + ?Sized, F: ?Sized>(ctx: &mut DecodeContext<'_, S, F>) {
    let null = || "NULL".to_string();
    let query = format!(
        "agent {} sca insert_policy {}|{}|{}|{}|{}|{}",
        ctx.agent_id,
        ctx.src_str(Field::Name).unwrap_or_else(null),
        ctx.src_str(Field::File).unwrap_or_else(null),
        ctx.src_str(Field::PolicyId).unwrap_or_else(null),
        ctx.src_str(Field::Description).unwrap_or_else(null),
        ctx.src_str(Field::References).unwrap_or_else(null),
        ctx.src_str(Field::HashFile).unwrap_or_else(null),
    );

    let (code, _) = ctx.store.query(&query);
    if code != ResponseCode::Ok {
        warn!(
            target: DECODE_TARGET,
            agent_id = %ctx.agent_id,
            "failed to insert policy"
        );
    }
}

/// Re-syncs a known policy when its file hash changed.
///
/// A changed hash means the agent runs a different revision of the policy
/// file; the stored policy and checks are dropped and a first-scan dump is
/// requested so the store rebuilds from the agent's current state.
fn update_policy_info<S: PolicyStore + ?Sized, F: DumpSink + ?Sized>(
    ctx: &mut DecodeContext<'_, S, F>,
    policy_id: &str,
) {
    let query = format!("agent {} sca query_policy_sha256 {policy_id}", ctx.agent_id);
    let (result, stored_hash_file) = search(ctx.store, &query, true);

    match result {
        SearchResult::Found => {
            let event_hash_file = ctx.src_str(Field::HashFile).unwrap_or_default();
            if stored_hash_file == event_hash_file {
                debug!(
                    target: DECODE_TARGET,
                    agent_id = %ctx.agent_id,
                    policy_id,
                    "policy file hash unchanged"
                );
            } else if delete_policy_and_check(ctx, policy_id) {
                push_dump_request(ctx.forwarder, &ctx.agent_id, policy_id, true);
            }
        }
        SearchResult::NotFound => {}
        SearchResult::Error => {
            warn!(
                target: DECODE_TARGET,
                agent_id = %ctx.agent_id,
                policy_id,
                "cannot query policy file hash"
            );
        }
    }
}

/// Compares the stored check-results hash with the summary's and requests a
/// dump on divergence or when the store holds no results yet.
fn check_results_and_dump<S: PolicyStore + ?Sized, F: DumpSink + ?Sized>(
    ctx: &mut DecodeContext<'_, S, F>,
    policy_id: &str,
    first_scan: bool,
    event_hash: &str,
) {
    let mut request_dump = false;
    let (result, stored_hash) = find_check_results(ctx, policy_id);

    match result {
        SearchResult::Found => {
            if stored_hash != event_hash {
                request_dump = true;
                debug!(
                    target: DECODE_TARGET,
                    agent_id = %ctx.agent_id,
                    policy_id,
                    stored_hash = %stored_hash,
                    event_hash,
                    "check results hash diverged, requesting dump"
                );
            }
        }
        SearchResult::NotFound => {
            request_dump = true;
            debug!(
                target: DECODE_TARGET,
                agent_id = %ctx.agent_id,
                policy_id,
                "no stored check results, requesting dump"
            );
        }
        SearchResult::Error => {
            warn!(
                target: DECODE_TARGET,
                agent_id = %ctx.agent_id,
                policy_id,
                "cannot query check results"
            );
        }
    }

    if request_dump {
        push_dump_request(ctx.forwarder, &ctx.agent_id, policy_id, first_scan);
    }
}
