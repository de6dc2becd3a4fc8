//! Relation references.
//!
//! A relation reference points at another stored object by class and id.
//! Two references are the same relation target iff both parts match.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Type tag carried by a pointer on the wire.
pub const POINTER_TYPE: &str = "Pointer";

/// An opaque reference to another stored object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationRef {
    /// Class of the target object
    pub class_name: String,
    /// Identifier of the target object
    pub object_id: String,
}

impl RelationRef {
    /// Create a new relation reference.
    pub fn new(class_name: impl Into<String>, object_id: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            object_id: object_id.into(),
        }
    }

    /// Both the class and the id are non-empty.
    pub fn is_complete(&self) -> bool {
        !self.class_name.is_empty() && !self.object_id.is_empty()
    }

    /// Wire representation of this reference.
    pub fn to_wire(&self) -> Value {
        json!({
            "__type": POINTER_TYPE,
            "className": self.class_name,
            "objectId": self.object_id,
        })
    }

    /// Parse a reference from its wire representation.
    ///
    /// The `__type` tag is optional but must be `Pointer` when present.
    pub fn from_wire(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        match obj.get("__type") {
            None => {}
            Some(Value::String(tag)) if tag == POINTER_TYPE => {}
            Some(_) => return None,
        }
        let class_name = obj.get("className")?.as_str()?;
        let object_id = obj.get("objectId")?.as_str()?;
        Some(Self::new(class_name, object_id)).filter(Self::is_complete)
    }
}

impl std::fmt::Display for RelationRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.class_name, self.object_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_form() {
        let r = RelationRef::new("Post", "p1");
        assert_eq!(
            r.to_wire(),
            json!({"__type": "Pointer", "className": "Post", "objectId": "p1"})
        );
        assert_eq!(RelationRef::from_wire(&r.to_wire()), Some(r));
    }

    #[test]
    fn from_wire_without_type_tag() {
        let parsed = RelationRef::from_wire(&json!({"className": "Post", "objectId": "p1"}));
        assert_eq!(parsed, Some(RelationRef::new("Post", "p1")));
    }

    #[test]
    fn from_wire_rejects_other_shapes() {
        assert!(RelationRef::from_wire(&json!("p1")).is_none());
        assert!(RelationRef::from_wire(&json!({"className": "Post"})).is_none());
        assert!(RelationRef::from_wire(&json!({
            "__type": "GeoPoint", "className": "Post", "objectId": "p1"
        }))
        .is_none());
        assert!(RelationRef::from_wire(&json!({"className": "", "objectId": "p1"})).is_none());
    }

    #[test]
    fn identity_equality() {
        assert_eq!(RelationRef::new("A", "1"), RelationRef::new("A", "1"));
        assert_ne!(RelationRef::new("A", "1"), RelationRef::new("B", "1"));
    }
}
