//! Typed accessor over a mutable JSON event document.
//!
//! [`EventDoc`] wraps the event being decoded and exposes the pointer-based
//! probes and mutators the handlers rely on. Getters report absence instead
//! of failing when a path is missing or carries the wrong type; mutators
//! create missing object intermediates along the pointer so normalization
//! can write under `/sca` without preparing the tree first.

use serde_json::{Map, Value};

/// Mutable view over one JSON event document.
#[derive(Debug)]
pub struct EventDoc<'a> {
    root: &'a mut Value,
}

impl<'a> EventDoc<'a> {
    /// Wraps the given document.
    pub fn new(root: &'a mut Value) -> Self {
        Self { root }
    }

    /// Returns true when a value exists at the pointer.
    #[must_use]
    pub fn exists(&self, pointer: &str) -> bool {
        self.root.pointer(pointer).is_some()
    }

    /// Returns true when the value at the pointer is a string.
    #[must_use]
    pub fn is_string(&self, pointer: &str) -> bool {
        self.root.pointer(pointer).is_some_and(Value::is_string)
    }

    /// Returns true when the value at the pointer is an integer.
    #[must_use]
    pub fn is_int(&self, pointer: &str) -> bool {
        self.root.pointer(pointer).is_some_and(Value::is_i64)
    }

    /// Returns true when the value at the pointer is a boolean.
    #[must_use]
    pub fn is_bool(&self, pointer: &str) -> bool {
        self.root.pointer(pointer).is_some_and(Value::is_boolean)
    }

    /// Returns true when the value at the pointer is an array.
    #[must_use]
    pub fn is_array(&self, pointer: &str) -> bool {
        self.root.pointer(pointer).is_some_and(Value::is_array)
    }

    /// Returns true when the value at the pointer is an object.
    #[must_use]
    pub fn is_object(&self, pointer: &str) -> bool {
        self.root.pointer(pointer).is_some_and(Value::is_object)
    }

    /// Returns the string at the pointer, if present.
    #[must_use]
    pub fn get_str(&self, pointer: &str) -> Option<&str> {
        self.root.pointer(pointer).and_then(Value::as_str)
    }

    /// Returns the integer at the pointer, if present.
    #[must_use]
    pub fn get_int(&self, pointer: &str) -> Option<i64> {
        self.root.pointer(pointer).and_then(Value::as_i64)
    }

    /// Returns the array at the pointer, if present.
    #[must_use]
    pub fn get_array(&self, pointer: &str) -> Option<&Vec<Value>> {
        self.root.pointer(pointer).and_then(Value::as_array)
    }

    /// Returns the object at the pointer, if present.
    #[must_use]
    pub fn get_object(&self, pointer: &str) -> Option<&Map<String, Value>> {
        self.root.pointer(pointer).and_then(Value::as_object)
    }

    /// Serializes the subtree at the pointer, if present.
    #[must_use]
    pub fn subtree_str(&self, pointer: &str) -> Option<String> {
        self.root
            .pointer(pointer)
            .and_then(|value| serde_json::to_string(value).ok())
    }

    /// Copies the subtree at `src` to `dst`. Absent sources are a no-op.
    pub fn copy(&mut self, dst: &str, src: &str) {
        if let Some(value) = self.root.pointer(src).cloned() {
            *self.slot(dst) = value;
        }
    }

    /// Writes a string at the pointer.
    pub fn set_string(&mut self, value: &str, pointer: &str) {
        *self.slot(pointer) = Value::String(value.to_string());
    }

    /// Writes a boolean at the pointer.
    pub fn set_bool(&mut self, value: bool, pointer: &str) {
        *self.slot(pointer) = Value::Bool(value);
    }

    /// Replaces the value at the pointer with an empty array.
    pub fn set_array(&mut self, pointer: &str) {
        *self.slot(pointer) = Value::Array(Vec::new());
    }

    /// Appends a string to the array at the pointer.
    ///
    /// A missing or non-array target is replaced by a fresh array first.
    pub fn append_string(&mut self, value: &str, pointer: &str) {
        let slot = self.slot(pointer);
        if !slot.is_array() {
            *slot = Value::Array(Vec::new());
        }
        if let Some(items) = slot.as_array_mut() {
            items.push(Value::String(value.to_string()));
        }
    }

    /// Resolves the pointer for writing, creating missing intermediates.
    ///
    /// Intermediate tokens traverse existing objects and in-range array
    /// indices; anything else in the way is replaced by an object.
    fn slot(&mut self, pointer: &str) -> &mut Value {
        tokens(pointer).fold(&mut *self.root, descend)
    }
}

/// Steps one reference token deeper into the document, creating the slot
/// when it does not exist yet.
fn descend(target: &mut Value, token: String) -> &mut Value {
    let index = match &*target {
        Value::Array(items) => token
            .parse::<usize>()
            .ok()
            .filter(|index| *index < items.len()),
        _ => None,
    };
    match (index, target) {
        (Some(index), Value::Array(items)) => &mut items[index],
        (_, target) => {
            if !target.is_object() {
                *target = Value::Object(Map::new());
            }
            match target {
                Value::Object(map) => map.entry(token).or_insert(Value::Null),
                _ => unreachable!("intermediate was just made an object"),
            }
        }
    }
}

/// Splits a JSON pointer into its unescaped reference tokens.
fn tokens(pointer: &str) -> impl Iterator<Item = String> + '_ {
    pointer
        .split('/')
        .skip(1)
        .map(|token| token.replace("~1", "/").replace("~0", "~"))
}
