//! Event-kind handlers for the SCA decoder.
//!
//! One module per protocol event kind (`check`, `summary`, `policies`,
//! `dump_end`). Handlers orchestrate validation, store reconciliation,
//! normalization under the destination prefix, and dump triggering. Shared
//! store helpers used by more than one kind live here.

pub mod check;
pub mod dump;
pub mod policies;
pub mod summary;

use tracing::warn;

use crate::context::DecodeContext;
use crate::store::{PolicyStore, ResponseCode, SearchResult, search};

/// Tracing target for handler decisions.
pub(crate) const DECODE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::decode");

/// Fetches the stored check-results hash for one policy.
pub(crate) fn find_check_results<S: PolicyStore + ?Sized, F: ?Sized>(
    ctx: &mut DecodeContext<'_, S, F>,
    policy_id: &str,
) -> (SearchResult, String) {
    let query = format!("agent {} sca query_results {policy_id}", ctx.agent_id);
    search(ctx.store, &query, true)
}

/// Removes a policy and its checks from the store.
///
/// A failed policy delete aborts and returns false. A failed check delete
/// after a successful policy delete is logged but still counts as success,
/// since the primary deletion went through.
pub(crate) fn delete_policy_and_check<S: PolicyStore + ?Sized, F: ?Sized>(
    ctx: &mut DecodeContext<'_, S, F>,
    policy_id: &str,
) -> bool {
    let query = format!("agent {} sca delete_policy {policy_id}", ctx.agent_id);
    let (code, _) = ctx.store.query(&query);
    if code != ResponseCode::Ok {
        warn!(
            target: DECODE_TARGET,
            agent_id = %ctx.agent_id,
            policy_id,
            "failed to delete policy"
        );
        return false;
    }

    let query = format!("agent {} sca delete_check {policy_id}", ctx.agent_id);
    let (code, _) = ctx.store.query(&query);
    if code != ResponseCode::Ok {
        warn!(
            target: DECODE_TARGET,
            agent_id = %ctx.agent_id,
            policy_id,
            "failed to delete checks for policy"
        );
    }

    true
}
