//! Wire encoding of reduced operations.
//!
//! Each reduced key becomes one JSON value in the request body. `Set` is sent
//! as the raw value; every other kind is wrapped in an object tagged with
//! `__op`:
//!
//! ```json
//! {
//!   "name": "Ann",
//!   "age": {"__op": "Increment", "amount": 1},
//!   "tags": {"__op": "AddUnique", "objects": ["a", "b"]},
//!   "avatar": {"__op": "Delete"}
//! }
//! ```

use crate::{error::Result, Change, Error, Operation, OperationKind, ReducedTable, RelationRef};
use serde_json::{json, Map, Value};

/// Tag field marking a wrapped operation.
pub const OP_FIELD: &str = "__op";

/// A request body: one wire value per field key.
pub type Payload = Map<String, Value>;

impl Operation {
    /// Wire value of this operation.
    pub fn to_wire(&self) -> Value {
        let kind = self.kind().as_str();
        match self.change() {
            Change::Set(value) => value.clone(),
            Change::Delete => json!({ OP_FIELD: kind }),
            Change::Increment(amount) => json!({ OP_FIELD: kind, "amount": amount.to_value() }),
            Change::Add(items) | Change::AddUnique(items) | Change::Remove(items) => {
                json!({ OP_FIELD: kind, "objects": items })
            }
            Change::AddRelation(targets) | Change::RemoveRelation(targets) => {
                let objects: Vec<Value> = targets.iter().map(RelationRef::to_wire).collect();
                json!({ OP_FIELD: kind, "objects": objects })
            }
        }
    }

    /// Decode one wire value for `key`.
    ///
    /// A value without an `__op` tag is a `Set`.
    pub fn from_wire(key: impl Into<String>, value: Value) -> Result<Self> {
        let mut obj = match value {
            Value::Object(obj) if obj.contains_key(OP_FIELD) => obj,
            other => return Operation::new(OperationKind::Set, key, Some(other)),
        };

        let kind = match obj.get(OP_FIELD).unwrap_or(&Value::Null) {
            Value::String(tag) if tag != OperationKind::Set.as_str() => tag.parse()?,
            Value::String(tag) => return Err(Error::UnknownOperation(tag.clone())),
            other => return Err(Error::UnknownOperation(other.to_string())),
        };
        let argument = match kind {
            OperationKind::Set | OperationKind::Delete => None,
            OperationKind::Increment => obj.remove("amount"),
            _ => obj.remove("objects"),
        };
        Operation::new(kind, key, argument)
    }
}

/// Encode a reduced table as a request body.
pub fn encode(table: &ReducedTable) -> Payload {
    table
        .iter()
        .map(|(key, operation)| (key.clone(), operation.to_wire()))
        .collect()
}

/// Decode a request body into operations, in key order.
pub fn decode(payload: &Payload) -> Result<Vec<Operation>> {
    payload
        .iter()
        .map(|(key, value)| Operation::from_wire(key.clone(), value.clone()))
        .collect()
}
