//! Normalized entity caches.
//!
//! A [`NormalizedCache`] keeps the records of one resource at
//! `[resource, id]` in the state tree, so every reader of a record sees the
//! same single copy. Every domain store owns one cache and routes its reducer's
//! writes through [`NormalizedCache::receive_data`].

use std::fmt;
use std::marker::PhantomData;
use std::sync::OnceLock;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

use strata_state::{PathNode, StateTree};
use strata_types::{Path, PathError, Value};

use crate::dispatcher::DispatchToken;
use crate::error::StoreError;

/// How an incoming record combines with the stored record of the same id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// The incoming record replaces the stored one.
    #[default]
    Replace,
    /// Top-level fields of the incoming record overwrite stored fields; other
    /// stored fields persist.
    Merge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheMode {
    /// A map from id to record.
    #[default]
    Keyed,
    /// One record stored directly at the resource node. Records need no id.
    Singleton,
}

/// Entity storage for one resource.
///
/// Reads deserialize into `T`; writes accept any `Serialize` record, so partial
/// patch types can be merged into full records.
pub struct NormalizedCache<T> {
    resource: String,
    mode: CacheMode,
    node: PathNode,
    pub(crate) registration: OnceLock<DispatchToken>,
    _entity: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> NormalizedCache<T> {
    pub fn new(tree: &StateTree, resource: impl Into<String>) -> Self {
        Self::scoped(&tree.root(), resource, CacheMode::Keyed)
    }

    pub fn singleton(tree: &StateTree, resource: impl Into<String>) -> Self {
        Self::scoped(&tree.root(), resource, CacheMode::Singleton)
    }

    /// A cache stored under `parent`, for feature areas that namespace their
    /// resources.
    pub fn scoped(parent: &PathNode, resource: impl Into<String>, mode: CacheMode) -> Self {
        let resource = resource.into();
        let default = match mode {
            CacheMode::Keyed => Value::map(),
            CacheMode::Singleton => Value::Null,
        };
        Self {
            node: parent.sub(resource.as_str(), default),
            resource,
            mode,
            registration: OnceLock::new(),
            _entity: PhantomData,
        }
    }

    #[must_use]
    pub fn resource(&self) -> &str {
        &self.resource
    }

    #[must_use]
    pub fn mode(&self) -> CacheMode {
        self.mode
    }

    #[must_use]
    pub fn node(&self) -> &PathNode {
        &self.node
    }

    /// The dispatcher token, once a store owning this cache is registered.
    #[must_use]
    pub fn registration(&self) -> Option<DispatchToken> {
        self.registration.get().copied()
    }

    /// Upserts `records` by id in a single tree swap.
    ///
    /// Every record is validated before anything is written, so a batch with
    /// one bad record leaves the cache untouched. Within a batch the last
    /// record for an id wins (or merges last).
    pub fn receive_data<R: Serialize>(
        &self,
        records: impl IntoIterator<Item = R>,
        mode: WriteMode,
    ) -> Result<usize, StoreError> {
        let batch = self.normalize(records)?;
        let received = batch.len();
        self.node
            .edit(|stored| apply(stored, self.mode, batch, mode))?;
        tracing::trace!(resource = %self.resource, received, ?mode, "records received");
        Ok(received)
    }

    /// Deletes one record. Removing an unknown id is a no-op.
    pub fn remove(&self, id: &str) -> bool {
        match self.mode {
            CacheMode::Keyed => self.node.remove_in(id),
            CacheMode::Singleton => {
                if self.stored_id(&self.node.value()).as_deref() == Some(id) {
                    self.node.empty()
                } else {
                    false
                }
            }
        }
    }

    /// Deletes every record of this resource.
    pub fn empty(&self) -> bool {
        self.node.empty()
    }

    /// All records, in key order. Callers that need another order sort.
    pub fn get_all(&self) -> Result<Vec<T>, StoreError> {
        match self.mode {
            CacheMode::Keyed => {
                let stored = self.node.value();
                stored
                    .as_map()
                    .map(|entities| {
                        entities
                            .values()
                            .map(|record| self.decode(record))
                            .collect::<Result<Vec<_>, _>>()
                    })
                    .unwrap_or_else(|| Ok(Vec::new()))
            }
            CacheMode::Singleton => Ok(self.get()?.into_iter().collect()),
        }
    }

    pub fn get_by_id(&self, id: &str) -> Result<Option<T>, StoreError> {
        let record = match self.mode {
            CacheMode::Keyed => self.node.get_in(id, Value::Null),
            CacheMode::Singleton => {
                let stored = self.node.value();
                if self.stored_id(&stored).as_deref() == Some(id) {
                    stored
                } else {
                    Value::Null
                }
            }
        };
        if record.is_null() {
            return Ok(None);
        }
        self.decode(&record).map(Some)
    }

    pub fn get_by_id_or(&self, id: &str, fallback: T) -> Result<T, StoreError> {
        Ok(self.get_by_id(id)?.unwrap_or(fallback))
    }

    /// Records for `ids`, in the order given. Unknown ids are skipped.
    pub fn get_by_ids<'a>(
        &self,
        ids: impl IntoIterator<Item = &'a str>,
    ) -> Result<Vec<T>, StoreError> {
        let mut found = Vec::new();
        for id in ids {
            if let Some(record) = self.get_by_id(id)? {
                found.push(record);
            }
        }
        Ok(found)
    }

    /// The record of a singleton cache. Keyed caches hold no single record
    /// and always return `None`.
    pub fn get(&self) -> Result<Option<T>, StoreError> {
        if self.mode == CacheMode::Keyed {
            return Ok(None);
        }
        let stored = self.node.value();
        if stored.is_null() {
            return Ok(None);
        }
        self.decode(&stored).map(Some)
    }

    #[must_use]
    pub fn ids(&self) -> Vec<String> {
        match self.mode {
            CacheMode::Keyed => self.node.keys(),
            CacheMode::Singleton => self.stored_id(&self.node.value()).into_iter().collect(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        match self.mode {
            CacheMode::Keyed => self.node.size(),
            CacheMode::Singleton => usize::from(!self.node.value().is_null()),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        match self.mode {
            CacheMode::Keyed => self.node.has(id),
            CacheMode::Singleton => self.stored_id(&self.node.value()).as_deref() == Some(id),
        }
    }

    /// Replaces the cache contents with the records of an already
    /// denormalized payload, in one tree swap.
    ///
    /// Accepted shapes: an array of records, an id-keyed object of records
    /// (the `entities[resource]` shape), a single record (an object with an
    /// `id` field, or any object for a singleton), or `null` for none.
    pub fn initialize(&self, payload: JsonValue) -> Result<usize, StoreError> {
        let records = match payload {
            JsonValue::Null => Vec::new(),
            JsonValue::Array(records) => records,
            JsonValue::Object(map)
                if self.mode == CacheMode::Singleton || map.contains_key("id") =>
            {
                vec![JsonValue::Object(map)]
            }
            JsonValue::Object(map) => map.into_iter().map(|(_, record)| record).collect(),
            other => {
                return Err(StoreError::InvalidPayload {
                    resource: self.resource.clone(),
                    found: json_kind(&other),
                });
            }
        };

        let batch = self.normalize(records)?;
        let loaded = batch.len();
        let fresh = self.node.default_value().clone();
        self.node.edit(|stored| {
            *stored = fresh;
            apply(stored, self.mode, batch, WriteMode::Replace)
        })?;
        tracing::debug!(resource = %self.resource, loaded, "cache initialized");
        Ok(loaded)
    }

    fn normalize<R: Serialize>(
        &self,
        records: impl IntoIterator<Item = R>,
    ) -> Result<Vec<(String, Value)>, StoreError> {
        records
            .into_iter()
            .map(|record| {
                let json = serde_json::to_value(record).map_err(|source| StoreError::Serde {
                    resource: self.resource.clone(),
                    source,
                })?;
                let record = Value::from(json);
                let id = match self.mode {
                    CacheMode::Keyed => self.require_id(&record)?,
                    CacheMode::Singleton => self.stored_id(&record).unwrap_or_default(),
                };
                Ok((id, record))
            })
            .collect()
    }

    fn require_id(&self, record: &Value) -> Result<String, StoreError> {
        match record.get("id") {
            None | Some(Value::Null) => Err(StoreError::MissingId {
                resource: self.resource.clone(),
            }),
            Some(id) => id_key(id).ok_or_else(|| StoreError::InvalidId {
                resource: self.resource.clone(),
                found: id.to_json().to_string(),
            }),
        }
    }

    fn stored_id(&self, record: &Value) -> Option<String> {
        record.get("id").and_then(id_key)
    }

    fn decode(&self, record: &Value) -> Result<T, StoreError> {
        serde_json::from_value(record.to_json()).map_err(|source| StoreError::Serde {
            resource: self.resource.clone(),
            source,
        })
    }
}

fn apply(
    stored: &mut Value,
    cache_mode: CacheMode,
    batch: Vec<(String, Value)>,
    mode: WriteMode,
) -> Result<(), PathError> {
    for (id, record) in batch {
        match (cache_mode, mode) {
            (CacheMode::Keyed, WriteMode::Replace) => stored.set_in(&Path::from(id), record)?,
            (CacheMode::Keyed, WriteMode::Merge) => {
                stored.update_in(&Path::from(id), Value::Null, |mut existing| {
                    existing.merge(record);
                    existing
                })?;
            }
            (CacheMode::Singleton, WriteMode::Replace) => *stored = record,
            (CacheMode::Singleton, WriteMode::Merge) => stored.merge(record),
        }
    }
    Ok(())
}

fn id_key(id: &Value) -> Option<String> {
    match id {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) if n.is_i64() || n.is_u64() => Some(n.to_string()),
        _ => None,
    }
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

impl<T> fmt::Debug for NormalizedCache<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NormalizedCache")
            .field("resource", &self.resource)
            .field("mode", &self.mode)
            .field("registration", &self.registration.get())
            .finish_non_exhaustive()
    }
}
