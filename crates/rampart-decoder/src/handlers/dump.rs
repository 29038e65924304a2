//! Handler for `dump_end` events.
//!
//! A dump_end closes the re-synchronization an earlier dump request started.
//! The handler drops check rows left over from older scans and verifies the
//! store converged: if the check-results hash still disagrees with the scan
//! info hash, another dump is requested.

use tracing::{debug, warn};

use crate::context::DecodeContext;
use crate::errors::DecodeError;
use crate::field::Field;
use crate::forwarder::{DumpSink, push_dump_request};
use crate::store::{PolicyStore, ResponseCode, SearchResult, search};
use crate::validate::{Condition, FieldKind, is_valid_event};

use super::{DECODE_TARGET, find_check_results};

pub(crate) const KIND: &str = "dump_end";

const SCHEMA: [Condition; 3] = [
    Condition::required(Field::ElementsSent, FieldKind::Int),
    Condition::required(Field::PolicyId, FieldKind::String),
    Condition::required(Field::ScanId, FieldKind::Int),
];

/// Processes one `dump_end` event.
pub fn handle<S: PolicyStore + ?Sized, F: DumpSink + ?Sized>(
    ctx: &mut DecodeContext<'_, S, F>,
) -> Result<(), DecodeError> {
    if !is_valid_event(ctx, &SCHEMA) {
        return Err(DecodeError::invalid_event(KIND));
    }
    let policy_id = ctx
        .src_str(Field::PolicyId)
        .ok_or_else(|| DecodeError::invalid_event(KIND))?;
    let scan_id = ctx
        .src_int(Field::ScanId)
        .ok_or_else(|| DecodeError::invalid_event(KIND))?;

    let query = format!(
        "agent {} sca delete_check_distinct {policy_id}|{scan_id}",
        ctx.agent_id
    );
    let (code, _) = ctx.store.query(&query);
    if code != ResponseCode::Ok {
        warn!(
            target: DECODE_TARGET,
            agent_id = %ctx.agent_id,
            policy_id = %policy_id,
            scan_id,
            "failed to delete superseded check rows"
        );
    }

    let (check_result, check_hash) = find_check_results(ctx, &policy_id);
    match check_result {
        SearchResult::Found => {
            let query = format!("agent {} sca query_scan {policy_id}", ctx.agent_id);
            let (scan_result, scan_hash) = search(ctx.store, &query, true);
            match scan_result {
                SearchResult::Found => {
                    // The whole scan-info tail takes part in the comparison.
                    if check_hash != scan_hash {
                        push_dump_request(ctx.forwarder, &ctx.agent_id, &policy_id, false);
                        debug!(
                            target: DECODE_TARGET,
                            agent_id = %ctx.agent_id,
                            policy_id = %policy_id,
                            check_hash = %check_hash,
                            scan_hash = %scan_hash,
                            "store did not converge after dump, requesting another"
                        );
                    }
                }
                SearchResult::NotFound => {}
                SearchResult::Error => {
                    warn!(
                        target: DECODE_TARGET,
                        agent_id = %ctx.agent_id,
                        policy_id = %policy_id,
                        "cannot query scan info after dump"
                    );
                }
            }
        }
        SearchResult::NotFound => {}
        SearchResult::Error => {
            warn!(
                target: DECODE_TARGET,
                agent_id = %ctx.agent_id,
                policy_id = %policy_id,
                "cannot query check results after dump"
            );
        }
    }

    Ok(())
}
