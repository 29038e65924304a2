//! Handler for `check` events.
//!
//! A check event reports the outcome of one compliance test. The handler
//! reconciles it against the stored prior result, persists the new state,
//! and normalizes the event only when the outcome changed, so downstream
//! alerting stays quiet on unchanged results. Newly seen checks also push
//! their compliance entries and rules into the store.

use tracing::warn;

use crate::context::DecodeContext;
use crate::errors::DecodeError;
use crate::field::Field;
use crate::forwarder::DumpSink;
use crate::store::{PolicyStore, ResponseCode, SearchResult, search};
use crate::validate::{Condition, FieldKind, is_valid_event};

use super::DECODE_TARGET;

pub(crate) const KIND: &str = "check";

const SCHEMA: [Condition; 20] = [
    Condition::optional(Field::CheckCommand, FieldKind::String),
    Condition::optional(Field::CheckCompliance, FieldKind::Object),
    Condition::optional(Field::CheckCondition, FieldKind::String),
    Condition::optional(Field::CheckDescription, FieldKind::String),
    Condition::optional(Field::CheckDirectory, FieldKind::String),
    Condition::optional(Field::CheckFile, FieldKind::String),
    Condition::required(Field::CheckId, FieldKind::Int),
    Condition::optional(Field::CheckProcess, FieldKind::String),
    Condition::optional(Field::CheckRationale, FieldKind::String),
    Condition::optional(Field::CheckReason, FieldKind::String),
    Condition::optional(Field::CheckReferences, FieldKind::String),
    Condition::optional(Field::CheckRegistry, FieldKind::String),
    Condition::optional(Field::CheckRemediation, FieldKind::String),
    Condition::optional(Field::CheckResult, FieldKind::String),
    Condition::optional(Field::CheckRules, FieldKind::Array),
    Condition::required(Field::CheckTitle, FieldKind::String),
    Condition::required(Field::Check, FieldKind::Object),
    Condition::required(Field::Id, FieldKind::Int),
    Condition::required(Field::PolicyId, FieldKind::String),
    Condition::required(Field::Policy, FieldKind::String),
];

/// Validates the schema plus the outcome rule: a check carries either a
/// result, or a status with an accompanying reason.
fn is_valid_check_event<S: ?Sized, F: ?Sized>(ctx: &DecodeContext<'_, S, F>) -> bool {
    if !is_valid_event(ctx, &SCHEMA) {
        return false;
    }

    let has_result = ctx.exists_src(Field::CheckResult);
    let has_status = ctx.exists_src(Field::CheckStatus);
    let has_reason = ctx.exists_src(Field::CheckReason);

    !((!has_result && !has_status) || (has_status && !has_reason))
}

/// Processes one `check` event.
pub fn handle<S: PolicyStore + ?Sized, F: DumpSink + ?Sized>(
    ctx: &mut DecodeContext<'_, S, F>,
) -> Result<(), DecodeError> {
    if !is_valid_check_event(ctx) {
        warn!(
            target: DECODE_TARGET,
            agent_id = %ctx.agent_id,
            "discarding malformed check event"
        );
        return Err(DecodeError::invalid_event(KIND));
    }

    let check_id = ctx
        .src_int(Field::CheckId)
        .ok_or_else(|| DecodeError::invalid_event(KIND))?;
    let result = ctx.src_str(Field::CheckResult).unwrap_or_default();
    let status = ctx.src_str(Field::CheckStatus).unwrap_or_default();
    let reason = ctx.src_str(Field::CheckReason).unwrap_or_default();

    let query = format!("agent {} sca query {check_id}", ctx.agent_id);
    let (prior, previous_result) = search(ctx.store, &query, true);

    let save_query = match prior {
        SearchResult::Found => {
            let id = ctx.src_int(Field::Id).unwrap_or(-1);
            format!(
                "agent {} sca update {check_id}|{result}|{status}|{reason}|{id}",
                ctx.agent_id
            )
        }
        SearchResult::NotFound => {
            let root = ctx
                .src_subtree_str(Field::Root)
                .unwrap_or_else(|| "{}".to_string());
            format!("agent {} sca insert {root}", ctx.agent_id)
        }
        SearchResult::Error => {
            warn!(
                target: DECODE_TARGET,
                agent_id = %ctx.agent_id,
                check_id,
                "cannot query prior check result"
            );
            return Err(DecodeError::store_query("query", &ctx.agent_id));
        }
    };

    // A failed save is recovered by the next event for the same check.
    let (save_code, _) = ctx.store.query(&save_query);
    if save_code != ResponseCode::Ok {
        warn!(
            target: DECODE_TARGET,
            agent_id = %ctx.agent_id,
            check_id,
            "failed to save check state"
        );
    }

    if prior == SearchResult::NotFound {
        insert_compliance(ctx, check_id);
        insert_rules(ctx, check_id);
    }

    let normalize = if result.is_empty() {
        !status.is_empty() && previous_result != status
    } else {
        previous_result != result
    };

    if normalize {
        fill_check_event(ctx, &previous_result);
    }

    Ok(())
}

/// Materializes the check under the destination prefix.
fn fill_check_event<S: ?Sized, F: ?Sized>(
    ctx: &mut DecodeContext<'_, S, F>,
    previous_result: &str,
) {
    ctx.set_dst_string(KIND, Field::Type);

    if !previous_result.is_empty() {
        ctx.set_dst_string(previous_result, Field::CheckPreviousResult);
    }

    ctx.copy_if_exists(Field::Id);
    ctx.copy_if_exists(Field::Policy);
    ctx.copy_if_exists(Field::PolicyId);

    ctx.copy_if_exists(Field::CheckId);
    ctx.copy_if_exists(Field::CheckTitle);
    ctx.copy_if_exists(Field::CheckDescription);
    ctx.copy_if_exists(Field::CheckRationale);
    ctx.copy_if_exists(Field::CheckRemediation);
    ctx.copy_if_exists(Field::CheckCompliance);
    ctx.copy_if_exists(Field::CheckReferences);

    // CSV-valued scan targets become arrays on the destination side.
    ctx.csv_to_array_if_exists(Field::CheckFile);
    ctx.csv_to_array_if_exists(Field::CheckDirectory);
    ctx.csv_to_array_if_exists(Field::CheckRegistry);
    ctx.csv_to_array_if_exists(Field::CheckProcess);
    ctx.csv_to_array_if_exists(Field::CheckCommand);

    if ctx.exists_src(Field::CheckResult) {
        ctx.copy_if_exists(Field::CheckResult);
    } else {
        ctx.copy_if_exists(Field::CheckStatus);
        ctx.copy_if_exists(Field::CheckReason);
    }
}

/// Pushes the check's compliance entries into the store.
fn insert_compliance<S: PolicyStore + ?Sized, F: ?Sized>(
    ctx: &mut DecodeContext<'_, S, F>,
    check_id: i64,
) {
    let Some(compliance) = ctx.src_object(Field::CheckCompliance) else {
        return;
    };

    for (key, value) in compliance {
        let Some(value) = value.as_str() else {
            warn!(
                target: DECODE_TARGET,
                agent_id = %ctx.agent_id,
                check_id,
                key = %key,
                "expected string compliance entry"
            );
            continue;
        };

        let query = format!(
            "agent {} sca insert_compliance {check_id}|{key}|{value}",
            ctx.agent_id
        );
        let (code, _) = ctx.store.query(&query);
        if code != ResponseCode::Ok {
            warn!(
                target: DECODE_TARGET,
                agent_id = %ctx.agent_id,
                check_id,
                key = %key,
                "failed to insert compliance entry"
            );
        }
    }
}

/// Pushes the check's rules into the store, tagged by rule type.
fn insert_rules<S: PolicyStore + ?Sized, F: ?Sized>(
    ctx: &mut DecodeContext<'_, S, F>,
    check_id: i64,
) {
    let Some(rules) = ctx.src_array(Field::CheckRules) else {
        return;
    };

    for rule in rules {
        let Some(rule) = rule.as_str() else {
            warn!(
                target: DECODE_TARGET,
                agent_id = %ctx.agent_id,
                check_id,
                "expected string rule"
            );
            continue;
        };

        let Some(kind) = rule_type(rule) else {
            warn!(
                target: DECODE_TARGET,
                agent_id = %ctx.agent_id,
                check_id,
                rule,
                "unknown rule type"
            );
            continue;
        };

        let query = format!(
            "agent {} sca insert_rules {check_id}|{kind}|{rule}",
            ctx.agent_id
        );
        let (code, _) = ctx.store.query(&query);
        if code != ResponseCode::Ok {
            warn!(
                target: DECODE_TARGET,
                agent_id = %ctx.agent_id,
                check_id,
                rule,
                "failed to insert rule"
            );
        }
    }
}

/// Maps a rule's leading character to its type tag.
fn rule_type(rule: &str) -> Option<&'static str> {
    match rule.chars().next()? {
        'f' => Some("file"),
        'd' => Some("directory"),
        'r' => Some("registry"),
        'c' => Some("command"),
        'p' => Some("process"),
        'n' => Some("numeric"),
        _ => None,
    }
}
