//! Operation types for expressing field-level changes.
//!
//! An operation is one mutation intent on one field of an object: replace it,
//! erase it, bump a counter, or edit a list or relation. Operations are
//! immutable once constructed; construction is where payload shapes are
//! checked.

use crate::{error::Result, Error, FieldKey, RelationRef};
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::fmt;
use std::str::FromStr;

/// The closed set of operation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    Set,
    Delete,
    Increment,
    Add,
    AddUnique,
    AddRelation,
    Remove,
    RemoveRelation,
}

impl OperationKind {
    /// Every kind, in declaration order.
    pub const ALL: [OperationKind; 8] = [
        OperationKind::Set,
        OperationKind::Delete,
        OperationKind::Increment,
        OperationKind::Add,
        OperationKind::AddUnique,
        OperationKind::AddRelation,
        OperationKind::Remove,
        OperationKind::RemoveRelation,
    ];

    /// Wire name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Set => "Set",
            OperationKind::Delete => "Delete",
            OperationKind::Increment => "Increment",
            OperationKind::Add => "Add",
            OperationKind::AddUnique => "AddUnique",
            OperationKind::AddRelation => "AddRelation",
            OperationKind::Remove => "Remove",
            OperationKind::RemoveRelation => "RemoveRelation",
        }
    }

    /// Describes the payload this kind accepts.
    pub fn expected_payload(&self) -> &'static str {
        match self {
            OperationKind::Set => "a value",
            OperationKind::Delete => "no value",
            OperationKind::Increment => "number",
            OperationKind::Add | OperationKind::AddUnique | OperationKind::Remove => "array",
            OperationKind::AddRelation | OperationKind::RemoveRelation => {
                "array of relation references"
            }
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        OperationKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| Error::UnknownOperation(s.to_string()))
    }
}

/// A numeric delta: an integer, or a finite float.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Amount {
    Int(i64),
    Float(f64),
}

impl Amount {
    /// Read an amount from a JSON number.
    pub fn from_number(n: &Number) -> Option<Self> {
        if let Some(i) = n.as_i64() {
            Some(Amount::Int(i))
        } else {
            n.as_f64().filter(|f| f.is_finite()).map(Amount::Float)
        }
    }

    /// Read an amount from a JSON value, if it is a number.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => Self::from_number(n),
            _ => None,
        }
    }

    /// Add two amounts. Integers stay integers; any float makes the sum a
    /// float. Returns `None` on integer overflow or a non-finite sum.
    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        match (self, other) {
            (Amount::Int(a), Amount::Int(b)) => a.checked_add(b).map(Amount::Int),
            (a, b) => {
                let sum = a.as_f64() + b.as_f64();
                sum.is_finite().then_some(Amount::Float(sum))
            }
        }
    }

    pub fn as_f64(self) -> f64 {
        match self {
            Amount::Int(i) => i as f64,
            Amount::Float(f) => f,
        }
    }

    pub fn is_finite(self) -> bool {
        match self {
            Amount::Int(_) => true,
            Amount::Float(f) => f.is_finite(),
        }
    }

    /// JSON form of the amount.
    pub fn to_value(self) -> Value {
        match self {
            Amount::Int(i) => Value::from(i),
            Amount::Float(f) => Number::from_f64(f).map_or(Value::Null, Value::Number),
        }
    }
}

impl From<i64> for Amount {
    fn from(value: i64) -> Self {
        Amount::Int(value)
    }
}

impl From<f64> for Amount {
    fn from(value: f64) -> Self {
        Amount::Float(value)
    }
}

/// The payload-carrying half of an operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum Change {
    /// Replace the field's value.
    Set(Value),
    /// Erase the field.
    Delete,
    /// Add a delta to a numeric field.
    Increment(Amount),
    /// Append elements, duplicates kept.
    Add(Vec<Value>),
    /// Append elements not already present.
    AddUnique(Vec<Value>),
    /// Link related objects.
    AddRelation(Vec<RelationRef>),
    /// Remove every occurrence of the elements.
    Remove(Vec<Value>),
    /// Unlink related objects.
    RemoveRelation(Vec<RelationRef>),
}

impl Change {
    pub fn kind(&self) -> OperationKind {
        match self {
            Change::Set(_) => OperationKind::Set,
            Change::Delete => OperationKind::Delete,
            Change::Increment(_) => OperationKind::Increment,
            Change::Add(_) => OperationKind::Add,
            Change::AddUnique(_) => OperationKind::AddUnique,
            Change::AddRelation(_) => OperationKind::AddRelation,
            Change::Remove(_) => OperationKind::Remove,
            Change::RemoveRelation(_) => OperationKind::RemoveRelation,
        }
    }

    fn normalized(self) -> Self {
        match self {
            Change::AddUnique(items) => Change::AddUnique(dedup_first_seen(items)),
            Change::AddRelation(refs) => Change::AddRelation(dedup_first_seen(refs)),
            other => other,
        }
    }
}

/// One mutation of one field.
///
/// Deserialization goes through [`Operation::from_change`], so persisted
/// operations are validated and normalized like freshly built ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawOperation")]
pub struct Operation {
    key: FieldKey,
    change: Change,
}

#[derive(Deserialize)]
struct RawOperation {
    key: FieldKey,
    change: Change,
}

impl TryFrom<RawOperation> for Operation {
    type Error = Error;

    fn try_from(raw: RawOperation) -> Result<Self> {
        Operation::from_change(raw.key, raw.change)
    }
}

impl Operation {
    /// Create an operation from a kind and an untyped payload.
    ///
    /// `value` must match the kind: any value for `Set`, none for `Delete`,
    /// a number for `Increment`, an array for the list kinds and an array of
    /// relation references for the relation kinds.
    pub fn new(kind: OperationKind, key: impl Into<FieldKey>, value: Option<Value>) -> Result<Self> {
        let key = key.into();
        validate_key(&key)?;

        let mismatch = |got: String| Error::ValueTypeMismatch {
            kind,
            key: key.clone(),
            expected: kind.expected_payload().to_string(),
            got,
        };

        let change = match (kind, value) {
            (OperationKind::Set, Some(value)) => Change::Set(value),
            (OperationKind::Delete, None) => Change::Delete,
            (OperationKind::Increment, Some(Value::Number(n))) => match Amount::from_number(&n) {
                Some(amount) => Change::Increment(amount),
                None => return Err(mismatch(format!("unrepresentable number {}", n))),
            },
            (OperationKind::Add, Some(Value::Array(items))) => Change::Add(items),
            (OperationKind::AddUnique, Some(Value::Array(items))) => Change::AddUnique(items),
            (OperationKind::Remove, Some(Value::Array(items))) => Change::Remove(items),
            (OperationKind::AddRelation, Some(Value::Array(items))) => {
                Change::AddRelation(parse_relations(&items).map_err(mismatch)?)
            }
            (OperationKind::RemoveRelation, Some(Value::Array(items))) => {
                Change::RemoveRelation(parse_relations(&items).map_err(mismatch)?)
            }
            (_, None) => return Err(mismatch("nothing".to_string())),
            (_, Some(other)) => return Err(mismatch(type_name(&other).to_string())),
        };

        Ok(Self {
            key,
            change: change.normalized(),
        })
    }

    /// Create an operation from an already typed change.
    pub fn from_change(key: impl Into<FieldKey>, change: Change) -> Result<Self> {
        let key = key.into();
        validate_key(&key)?;

        let kind = change.kind();
        let mismatch = |got: &str| Error::ValueTypeMismatch {
            kind,
            key: key.clone(),
            expected: kind.expected_payload().to_string(),
            got: got.to_string(),
        };
        match &change {
            Change::Increment(amount) if !amount.is_finite() => {
                return Err(mismatch("non-finite number"))
            }
            Change::AddRelation(targets) | Change::RemoveRelation(targets)
                if targets.iter().any(|t| !t.is_complete()) =>
            {
                return Err(mismatch("array containing a malformed reference"))
            }
            _ => {}
        }

        Ok(Self {
            key,
            change: change.normalized(),
        })
    }

    pub fn set(key: impl Into<FieldKey>, value: Value) -> Result<Self> {
        Self::from_change(key, Change::Set(value))
    }

    pub fn delete(key: impl Into<FieldKey>) -> Result<Self> {
        Self::from_change(key, Change::Delete)
    }

    pub fn increment(key: impl Into<FieldKey>, amount: impl Into<Amount>) -> Result<Self> {
        Self::from_change(key, Change::Increment(amount.into()))
    }

    pub fn add(key: impl Into<FieldKey>, objects: Vec<Value>) -> Result<Self> {
        Self::from_change(key, Change::Add(objects))
    }

    pub fn add_unique(key: impl Into<FieldKey>, objects: Vec<Value>) -> Result<Self> {
        Self::from_change(key, Change::AddUnique(objects))
    }

    pub fn add_relation(key: impl Into<FieldKey>, targets: Vec<RelationRef>) -> Result<Self> {
        Self::from_change(key, Change::AddRelation(targets))
    }

    pub fn remove(key: impl Into<FieldKey>, objects: Vec<Value>) -> Result<Self> {
        Self::from_change(key, Change::Remove(objects))
    }

    pub fn remove_relation(key: impl Into<FieldKey>, targets: Vec<RelationRef>) -> Result<Self> {
        Self::from_change(key, Change::RemoveRelation(targets))
    }

    /// The field this operation mutates.
    pub fn key(&self) -> &FieldKey {
        &self.key
    }

    pub fn kind(&self) -> OperationKind {
        self.change.kind()
    }

    pub fn change(&self) -> &Change {
        &self.change
    }

    pub fn into_change(self) -> Change {
        self.change
    }

    /// Same key, different change. Merge results are built this way.
    pub(crate) fn with_change(&self, change: Change) -> Self {
        Self {
            key: self.key.clone(),
            change: change.normalized(),
        }
    }
}

pub(crate) fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(Error::InvalidKey(key.to_string()));
    }
    Ok(())
}

fn parse_relations(items: &[Value]) -> std::result::Result<Vec<RelationRef>, String> {
    items
        .iter()
        .map(|item| {
            RelationRef::from_wire(item)
                .ok_or_else(|| format!("array containing {}", describe_element(item)))
        })
        .collect()
}

fn describe_element(value: &Value) -> &'static str {
    match value {
        Value::Object(_) => "a malformed reference",
        other => type_name(other),
    }
}

/// An integer too wide for `i64`; no delta can be added to it exactly.
pub(crate) fn is_wide_integer(value: &Value) -> bool {
    matches!(value, Value::Number(n) if n.is_u64() && !n.is_i64())
}

/// JSON type name of a value, for error messages.
pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Drop repeated elements, keeping the first occurrence of each.
pub(crate) fn dedup_first_seen<T: PartialEq>(items: Vec<T>) -> Vec<T> {
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        push_unique(&mut out, item);
    }
    out
}

pub(crate) fn push_unique<T: PartialEq>(into: &mut Vec<T>, item: T) {
    if !into.contains(&item) {
        into.push(item);
    }
}
