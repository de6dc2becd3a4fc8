//! Stored objects and payload application.

use chrono::{DateTime, SecondsFormat, Utc};
use opledger_engine::{payload, Operation, Payload};
use serde_json::{Map, Value};

/// Field names the store manages itself; payloads may not write them.
pub const RESERVED_FIELDS: [&str; 4] = ["objectId", "className", "createdAt", "updatedAt"];

/// One object held by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub class_name: String,
    pub object_id: String,
    pub fields: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoredObject {
    /// A new, empty object with a fresh id.
    pub fn new(class_name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            class_name: class_name.into(),
            object_id: uuid::Uuid::new_v4().simple().to_string(),
            fields: Map::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply every operation in `payload`, in key order.
    ///
    /// On error the object is left exactly as it was.
    pub fn apply_payload(&mut self, payload: &Payload) -> opledger_engine::error::Result<usize> {
        let operations = payload::decode(payload)?;
        self.fields = apply_operations(&self.fields, &operations)?;
        self.updated_at = Utc::now();
        Ok(operations.len())
    }

    /// JSON form returned to clients: fields plus store metadata.
    pub fn to_json(&self) -> Value {
        let mut body = self.fields.clone();
        body.insert("objectId".into(), Value::from(self.object_id.as_str()));
        body.insert("className".into(), Value::from(self.class_name.as_str()));
        body.insert("createdAt".into(), Value::from(timestamp(&self.created_at)));
        body.insert("updatedAt".into(), Value::from(timestamp(&self.updated_at)));
        Value::Object(body)
    }
}

/// Evaluate `operations` against a copy of `fields`.
pub fn apply_operations(
    fields: &Map<String, Value>,
    operations: &[Operation],
) -> opledger_engine::error::Result<Map<String, Value>> {
    let mut next = fields.clone();
    for operation in operations {
        match operation.apply_to(next.get(operation.key()))? {
            Some(value) => {
                next.insert(operation.key().clone(), value);
            }
            None => {
                next.remove(operation.key());
            }
        }
    }
    Ok(next)
}

/// The first reserved field a payload tries to write, if any.
pub fn reserved_field(payload: &Payload) -> Option<&str> {
    RESERVED_FIELDS
        .iter()
        .copied()
        .find(|field| payload.contains_key(*field))
}

/// Timestamps are ISO 8601 in UTC with millisecond precision.
pub fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}
