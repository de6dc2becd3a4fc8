//! In-memory object store.
//!
//! Objects are keyed by `(class, objectId)`. Each mutation runs under the
//! entry's shard lock, so a payload is applied to one object atomically.

mod objects;

pub use objects::*;

use std::sync::Arc;

use dashmap::DashMap;
use opledger_engine::Payload;

/// Key of a stored object: class name and object id.
pub type ObjectKey = (String, String);

/// Thread-safe object store, shared across handlers via `Arc`.
#[derive(Debug, Default)]
pub struct ObjectStore {
    objects: DashMap<ObjectKey, StoredObject>,
}

impl ObjectStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            objects: DashMap::new(),
        }
    }

    /// Create an empty store wrapped in Arc for sharing.
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Create an object of `class` from a payload.
    ///
    /// Nothing is stored if any operation fails.
    pub fn create(
        &self,
        class: &str,
        payload: &Payload,
    ) -> opledger_engine::error::Result<StoredObject> {
        let mut object = StoredObject::new(class);
        object.apply_payload(payload)?;
        object.updated_at = object.created_at;

        self.objects.insert(
            (class.to_string(), object.object_id.clone()),
            object.clone(),
        );
        tracing::debug!(class = %class, object_id = %object.object_id, "Object created");
        Ok(object)
    }

    /// Apply a payload to an existing object.
    ///
    /// Returns `Ok(None)` when the object does not exist.
    pub fn update(
        &self,
        class: &str,
        object_id: &str,
        payload: &Payload,
    ) -> opledger_engine::error::Result<Option<StoredObject>> {
        let Some(mut entry) = self
            .objects
            .get_mut(&(class.to_string(), object_id.to_string()))
        else {
            return Ok(None);
        };

        let applied = entry.apply_payload(payload)?;
        tracing::debug!(class = %class, object_id = %object_id, applied, "Object updated");
        Ok(Some(entry.value().clone()))
    }

    /// Fetch a copy of an object.
    pub fn get(&self, class: &str, object_id: &str) -> Option<StoredObject> {
        self.objects
            .get(&(class.to_string(), object_id.to_string()))
            .map(|entry| entry.value().clone())
    }

    /// Remove an object. Returns whether it existed.
    pub fn delete(&self, class: &str, object_id: &str) -> bool {
        let removed = self
            .objects
            .remove(&(class.to_string(), object_id.to_string()))
            .is_some();
        if removed {
            tracing::debug!(class = %class, object_id = %object_id, "Object deleted");
        }
        removed
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}
