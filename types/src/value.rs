//! Persistent state tree.
//!
//! [`Value`] is a JSON-shaped tree whose containers live behind `Arc`. Cloning a
//! value is O(1), and writing through a [`Path`] copies only the containers on
//! that path (`Arc::make_mut`). Every earlier clone keeps observing exactly the
//! tree it was taken from, and untouched subtrees stay shared between versions.

use std::collections::BTreeMap;
use std::mem;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Number, Value as JsonValue};
use thiserror::Error;

use crate::Path;

/// A node of the state tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    List(Arc<Vec<Value>>),
    /// Keys iterate in sorted order.
    Map(Arc<BTreeMap<String, Value>>),
}

/// A write addressed a location the tree cannot hold.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("cannot descend into `{path}`: it holds a scalar value")]
    NotAContainer { path: Path },
    #[error("`{path}` is not a list index")]
    InvalidIndex { path: Path },
    #[error("list index `{path}` is out of bounds (len {len})")]
    IndexOutOfBounds { path: Path, len: usize },
}

impl Value {
    /// An empty map.
    #[must_use]
    pub fn map() -> Self {
        Value::Map(Arc::new(BTreeMap::new()))
    }

    #[must_use]
    pub fn list(items: impl IntoIterator<Item = Value>) -> Self {
        Value::List(Arc::new(items.into_iter().collect()))
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    #[must_use]
    pub fn is_map(&self) -> bool {
        matches!(self, Value::Map(_))
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::Number(n) => n.as_u64(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Immediate child by key: a map entry, or a list element when `key` is an index.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Map(map) => map.get(key),
            Value::List(items) => key.parse::<usize>().ok().and_then(|idx| items.get(idx)),
            _ => None,
        }
    }

    #[must_use]
    pub fn get_in(&self, path: &Path) -> Option<&Value> {
        path.iter().try_fold(self, |node, key| node.get(key))
    }

    #[must_use]
    pub fn contains_in(&self, path: &Path) -> bool {
        self.get_in(path).is_some()
    }

    /// Number of immediate children. Scalars have none.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Value::Map(map) => map.len(),
            Value::List(items) => items.len(),
            _ => 0,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keys of the immediate children in iteration order.
    ///
    /// Lists report their indices; scalars report nothing.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        match self {
            Value::Map(map) => map.keys().cloned().collect(),
            Value::List(items) => (0..items.len()).map(|idx| idx.to_string()).collect(),
            _ => Vec::new(),
        }
    }

    /// Writes `value` at `path`, creating missing (or null) intermediate maps.
    ///
    /// Appending is allowed at `index == len` of a list.
    pub fn set_in(&mut self, path: &Path, value: Value) -> Result<(), PathError> {
        set_at(self, path, 0, value)
    }

    /// Removes the subtree at `path` and returns it.
    ///
    /// Returns `None`, leaving the tree untouched, when nothing lives at `path`.
    /// Removing the root path resets `self` to [`Value::Null`].
    pub fn remove_in(&mut self, path: &Path) -> Option<Value> {
        if path.is_root() {
            return Some(mem::take(self));
        }
        if !self.contains_in(path) {
            return None;
        }
        remove_at(self, path.keys())
    }

    /// Read-modify-write at `path`: `f` receives the current value (or `default`).
    pub fn update_in(
        &mut self,
        path: &Path,
        default: Value,
        f: impl FnOnce(Value) -> Value,
    ) -> Result<(), PathError> {
        let current = self.get_in(path).cloned().unwrap_or(default);
        self.set_in(path, f(current))
    }

    /// Shallow merge: when both sides are maps, entries of `other` overwrite
    /// same-named entries and all other entries persist. Otherwise `other`
    /// replaces `self`.
    pub fn merge(&mut self, other: Value) {
        match (self, other) {
            (Value::Map(existing), Value::Map(incoming)) => {
                Arc::make_mut(existing).extend(Arc::unwrap_or_clone(incoming));
            }
            (target, other) => *target = other,
        }
    }

    /// True when both values are containers backed by the same allocation.
    #[must_use]
    pub fn shares_storage_with(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Map(a), Value::Map(b)) => Arc::ptr_eq(a, b),
            (Value::List(a), Value::List(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    #[must_use]
    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Null => JsonValue::Null,
            Value::Bool(b) => JsonValue::Bool(*b),
            Value::Number(n) => JsonValue::Number(n.clone()),
            Value::String(s) => JsonValue::String(s.clone()),
            Value::List(items) => JsonValue::Array(items.iter().map(Value::to_json).collect()),
            Value::Map(map) => JsonValue::Object(
                map.iter()
                    .map(|(key, value)| (key.clone(), value.to_json()))
                    .collect(),
            ),
        }
    }
}

fn set_at(node: &mut Value, path: &Path, depth: usize, value: Value) -> Result<(), PathError> {
    let Some(key) = path.keys().get(depth) else {
        *node = value;
        return Ok(());
    };

    if node.is_null() {
        *node = Value::map();
    }

    match node {
        Value::Map(map) => {
            let child = Arc::make_mut(map).entry(key.clone()).or_default();
            set_at(child, path, depth + 1, value)
        }
        Value::List(items) => {
            let idx = key.parse::<usize>().map_err(|_| PathError::InvalidIndex {
                path: path.prefix(depth + 1),
            })?;
            let len = items.len();
            if idx > len {
                return Err(PathError::IndexOutOfBounds {
                    path: path.prefix(depth + 1),
                    len,
                });
            }
            let items = Arc::make_mut(items);
            if idx == len {
                items.push(Value::Null);
            }
            set_at(&mut items[idx], path, depth + 1, value)
        }
        _ => Err(PathError::NotAContainer {
            path: path.prefix(depth),
        }),
    }
}

// Callers check existence first, so no container is copied for a missing path.
fn remove_at(node: &mut Value, keys: &[String]) -> Option<Value> {
    let (key, rest) = keys.split_first()?;
    match node {
        Value::Map(map) => {
            let map = Arc::make_mut(map);
            if rest.is_empty() {
                map.remove(key)
            } else {
                remove_at(map.get_mut(key)?, rest)
            }
        }
        Value::List(items) => {
            let idx = key.parse::<usize>().ok()?;
            if idx >= items.len() {
                return None;
            }
            let items = Arc::make_mut(items);
            if rest.is_empty() {
                Some(items.remove(idx))
            } else {
                remove_at(&mut items[idx], rest)
            }
        }
        _ => None,
    }
}

impl From<JsonValue> for Value {
    fn from(json: JsonValue) -> Self {
        match json {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(b) => Value::Bool(b),
            JsonValue::Number(n) => Value::Number(n),
            JsonValue::String(s) => Value::String(s),
            JsonValue::Array(items) => Value::list(items.into_iter().map(Value::from)),
            JsonValue::Object(map) => map
                .into_iter()
                .map(|(key, value)| (key, Value::from(value)))
                .collect(),
        }
    }
}

impl From<&Value> for JsonValue {
    fn from(value: &Value) -> Self {
        value.to_json()
    }
}

impl From<Value> for JsonValue {
    fn from(value: Value) -> Self {
        value.to_json()
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n.into())
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n.into())
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Value::Number(n.into())
    }
}

/// Non-finite floats have no JSON representation and become [`Value::Null`].
impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Number::from_f64(n).map_or(Value::Null, Value::Number)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(Arc::new(items))
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Value {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Value::Map(Arc::new(
            iter.into_iter().map(|(key, value)| (key.into(), value)).collect(),
        ))
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(n) => n.serialize(serializer),
            Value::String(s) => serializer.serialize_str(s),
            Value::List(items) => serializer.collect_seq(items.iter()),
            Value::Map(map) => serializer.collect_map(map.iter()),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        JsonValue::deserialize(deserializer).map(Value::from)
    }
}
