//! Schema validation for incoming SCA events.
//!
//! Each event kind declares its expectations as a list of [`Condition`]
//! values checked against the source side of the event document. A field
//! that exists must carry the declared type; a mandatory field must exist.
//! The first failing condition rejects the event, and condition order never
//! changes the verdict.

use crate::context::DecodeContext;
use crate::field::Field;

/// Expected JSON type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Int,
    Bool,
    Array,
    Object,
}

/// One schema expectation on a source field.
#[derive(Debug, Clone, Copy)]
pub struct Condition {
    pub field: Field,
    pub kind: FieldKind,
    pub mandatory: bool,
}

impl Condition {
    /// A field that must exist with the given type.
    #[must_use]
    pub const fn required(field: Field, kind: FieldKind) -> Self {
        Self {
            field,
            kind,
            mandatory: true,
        }
    }

    /// A field that may be absent but must carry the given type if present.
    #[must_use]
    pub const fn optional(field: Field, kind: FieldKind) -> Self {
        Self {
            field,
            kind,
            mandatory: false,
        }
    }
}

/// Checks the event against a schema, short-circuiting on the first failure.
#[must_use]
pub fn is_valid_event<S: ?Sized, F: ?Sized>(
    ctx: &DecodeContext<'_, S, F>,
    conditions: &[Condition],
) -> bool {
    conditions.iter().all(|condition| {
        let path = ctx.src(condition.field);
        if ctx.event.exists(path) {
            match condition.kind {
                FieldKind::String => ctx.event.is_string(path),
                FieldKind::Int => ctx.event.is_int(path),
                FieldKind::Bool => ctx.event.is_bool(path),
                FieldKind::Array => ctx.event.is_array(path),
                FieldKind::Object => ctx.event.is_object(path),
            }
        } else {
            !condition.mandatory
        }
    })
}
