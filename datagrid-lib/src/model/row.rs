//! Row records and row identity

use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use serde::Deserializer;
use serde_json::Value;

use super::value::get_path;
use super::value::key_string;

/// An opaque, immutable row record.
///
/// Rows are shared by reference: cloning a `Row` clones the handle, not the
/// record. Without a configured row key, two rows are the same row only if
/// they are the same handle (see [`Row::ptr_eq`]).
#[derive(Clone)]
pub struct Row(Arc<Value>);

impl Row {
    /// Wraps a JSON record.
    pub fn new(value: Value) -> Self {
        Self(Arc::new(value))
    }

    /// The underlying record.
    pub fn value(&self) -> &Value {
        &self.0
    }

    /// Looks up a property path in the record.
    pub fn get(&self, path: &str) -> Option<&Value> {
        get_path(&self.0, path)
    }

    /// Returns `true` if both handles point at the same record.
    pub fn ptr_eq(&self, other: &Row) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Inline child records stored under `field`, if it holds an array.
    pub fn inline_children(&self, field: &str) -> Option<&[Value]> {
        match self.get(field) {
            Some(Value::Array(items)) => Some(items.as_slice()),
            _ => None,
        }
    }
}

impl fmt::Debug for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Row({})", self.0)
    }
}

impl From<Value> for Row {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}

impl<'de> Deserialize<'de> for Row {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Row::new)
    }
}

/// How a row's identity string is derived.
#[derive(Clone)]
pub enum RowKey {
    /// Dot-separated property path (`"id"`, `"meta.uuid"`).
    Path(String),
    /// Caller-provided key function.
    Func(Arc<dyn Fn(&Row) -> String + Send + Sync>),
}

impl RowKey {
    /// Key rows by a property path.
    pub fn path(path: impl Into<String>) -> Self {
        Self::Path(path.into())
    }

    /// Key rows with a function.
    pub fn func<F>(f: F) -> Self
    where
        F: Fn(&Row) -> String + Send + Sync + 'static,
    {
        Self::Func(Arc::new(f))
    }

    /// Computes the identity of a row.
    ///
    /// Total: a row without the key property gets the identity `"null"`.
    pub fn identity(&self, row: &Row) -> String {
        match self {
            RowKey::Path(path) => key_string(row.get(path)),
            RowKey::Func(f) => f(row),
        }
    }
}

impl fmt::Debug for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowKey::Path(path) => f.debug_tuple("Path").field(path).finish(),
            RowKey::Func(_) => f.write_str("Func(..)"),
        }
    }
}

impl From<&str> for RowKey {
    fn from(path: &str) -> Self {
        Self::path(path)
    }
}

impl From<String> for RowKey {
    fn from(path: String) -> Self {
        Self::Path(path)
    }
}

impl<'de> Deserialize<'de> for RowKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(RowKey::Path)
    }
}

/// Compares two rows by identity.
///
/// With a row key, rows are equal when their identities are equal. Without
/// one, only the same handle is equal.
pub fn same_row(row_key: Option<&RowKey>, a: &Row, b: &Row) -> bool {
    match row_key {
        Some(key) => a.ptr_eq(b) || key.identity(a) == key.identity(b),
        None => a.ptr_eq(b),
    }
}
