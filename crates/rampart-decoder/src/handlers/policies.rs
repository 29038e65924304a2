//! Handler for `policies` events.
//!
//! A policies event enumerates every policy the agent currently scans. Any
//! policy the store knows but the agent no longer reports is stale and gets
//! deleted together with its checks.

use tracing::{debug, warn};

use crate::context::DecodeContext;
use crate::errors::DecodeError;
use crate::field::Field;
use crate::store::{PolicyStore, SearchResult, search};
use crate::validate::{Condition, FieldKind, is_valid_event};

use super::{DECODE_TARGET, delete_policy_and_check};

pub(crate) const KIND: &str = "policies";

const SCHEMA: [Condition; 1] = [Condition::required(Field::Policies, FieldKind::Array)];

/// Processes one `policies` event.
pub fn handle<S: PolicyStore + ?Sized, F: ?Sized>(
    ctx: &mut DecodeContext<'_, S, F>,
) -> Result<(), DecodeError> {
    if !is_valid_event(ctx, &SCHEMA) {
        return Err(DecodeError::invalid_event(KIND));
    }

    let reported = ctx
        .src_array(Field::Policies)
        .ok_or_else(|| DecodeError::invalid_event(KIND))?;
    if reported.is_empty() {
        debug!(
            target: DECODE_TARGET,
            agent_id = %ctx.agent_id,
            "agent reports no policies"
        );
        return Ok(());
    }

    let query = format!("agent {} sca query_policies", ctx.agent_id);
    let (result, stored) = search(ctx.store, &query, true);
    if result == SearchResult::Error {
        warn!(
            target: DECODE_TARGET,
            agent_id = %ctx.agent_id,
            "cannot enumerate stored policies"
        );
        return Ok(());
    }

    for policy_id in stored.split(',').filter(|id| !id.is_empty()) {
        let still_scanned = reported
            .iter()
            .any(|policy| policy.as_str() == Some(policy_id));
        if !still_scanned {
            debug!(
                target: DECODE_TARGET,
                agent_id = %ctx.agent_id,
                policy_id,
                "policy no longer scanned, deleting"
            );
            delete_policy_and_check(ctx, policy_id);
        }
    }

    Ok(())
}
