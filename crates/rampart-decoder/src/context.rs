//! Per-invocation decoding context.
//!
//! A [`DecodeContext`] bundles everything one handler invocation may touch:
//! the mutable event document, the reporting agent's identifier, the shared
//! store and forwarder clients, and the source/destination path maps. The
//! decoder retains no state of its own between invocations; everything
//! durable lives in the store.

use serde_json::{Map, Value};

use crate::event::EventDoc;
use crate::field::{Field, FieldPaths};

/// Context handed to the event-kind handlers.
pub struct DecodeContext<'a, S: ?Sized, F: ?Sized> {
    /// The event document being decoded.
    pub event: EventDoc<'a>,
    /// Identifier of the reporting agent.
    pub agent_id: String,
    /// Shared policy-monitoring store client.
    pub store: &'a mut S,
    /// Shared dump-request sink client.
    pub forwarder: &'a mut F,
    /// Field paths rooted at the configured source prefix.
    pub source: &'a FieldPaths,
    /// Field paths rooted at the destination prefix.
    pub dest: &'a FieldPaths,
}

impl<S: ?Sized, F: ?Sized> DecodeContext<'_, S, F> {
    /// Returns the source pointer of the given field.
    #[must_use]
    pub fn src(&self, field: Field) -> &str {
        self.source.path(field)
    }

    /// Returns the destination pointer of the given field.
    #[must_use]
    pub fn dst(&self, field: Field) -> &str {
        self.dest.path(field)
    }

    /// Returns true when the field exists on the source side.
    #[must_use]
    pub fn exists_src(&self, field: Field) -> bool {
        self.event.exists(self.source.path(field))
    }

    /// Returns the source field's string value, if present.
    #[must_use]
    pub fn src_str(&self, field: Field) -> Option<String> {
        self.event
            .get_str(self.source.path(field))
            .map(str::to_string)
    }

    /// Returns the source field's integer value, if present.
    #[must_use]
    pub fn src_int(&self, field: Field) -> Option<i64> {
        self.event.get_int(self.source.path(field))
    }

    /// Returns a copy of the source field's array value, if present.
    #[must_use]
    pub fn src_array(&self, field: Field) -> Option<Vec<Value>> {
        self.event.get_array(self.source.path(field)).cloned()
    }

    /// Returns a copy of the source field's object value, if present.
    #[must_use]
    pub fn src_object(&self, field: Field) -> Option<Map<String, Value>> {
        self.event.get_object(self.source.path(field)).cloned()
    }

    /// Serializes the source subtree of the given field, if present.
    #[must_use]
    pub fn src_subtree_str(&self, field: Field) -> Option<String> {
        self.event.subtree_str(self.source.path(field))
    }

    /// Copies the field from the source side to the destination side when it
    /// exists.
    pub fn copy_if_exists(&mut self, field: Field) {
        let src = self.source.path(field);
        let dst = self.dest.path(field);
        self.event.copy(dst, src);
    }

    /// Writes a string at the field's destination pointer.
    pub fn set_dst_string(&mut self, value: &str, field: Field) {
        self.event.set_string(value, self.dest.path(field));
    }

    /// Rewrites a CSV-valued source string as a destination array.
    ///
    /// The split keeps empty segments, so joining the resulting array with
    /// `,` reproduces the original string. Absent fields are a no-op.
    pub fn csv_to_array_if_exists(&mut self, field: Field) {
        let Some(csv) = self.src_str(field) else {
            return;
        };
        let dst = self.dest.path(field);
        self.event.set_array(dst);
        for item in csv.split(',') {
            self.event.append_string(item, dst);
        }
    }
}
