//! Evaluating an operation against a field's current value.
//!
//! This is what a receiving store does with a decoded operation. `None`
//! stands for an absent field.

use crate::operation::{is_wide_integer, push_unique, type_name};
use crate::{error::Result, Amount, Change, Error, Operation, RelationRef};
use serde_json::Value;

impl Operation {
    /// Apply this operation to `current`, returning the field's new value.
    pub fn apply_to(&self, current: Option<&Value>) -> Result<Option<Value>> {
        let cannot = |reason: String| Error::CannotApply {
            key: self.key().clone(),
            kind: self.kind(),
            reason,
        };

        let next = match self.change() {
            Change::Set(value) => Some(value.clone()),
            Change::Delete => None,
            Change::Increment(delta) => {
                let base = match current {
                    None => Amount::Int(0),
                    Some(value) if is_wide_integer(value) => {
                        return Err(Error::NumericOverflow(self.key().clone()))
                    }
                    Some(value) => Amount::from_value(value)
                        .ok_or_else(|| cannot(format!("field holds a {}", type_name(value))))?,
                };
                let sum = base
                    .checked_add(*delta)
                    .ok_or_else(|| Error::NumericOverflow(self.key().clone()))?;
                Some(sum.to_value())
            }
            Change::Add(items) => {
                let mut array = existing_array(current).map_err(&cannot)?;
                array.extend(items.iter().cloned());
                Some(Value::Array(array))
            }
            Change::AddUnique(items) => {
                let mut array = existing_array(current).map_err(&cannot)?;
                for item in items {
                    push_unique(&mut array, item.clone());
                }
                Some(Value::Array(array))
            }
            Change::AddRelation(targets) => {
                let mut array = existing_array(current).map_err(&cannot)?;
                for target in targets {
                    if !array.iter().any(|e| refers_to(e, target)) {
                        array.push(target.to_wire());
                    }
                }
                Some(Value::Array(array))
            }
            Change::Remove(items) => match current {
                None => None,
                Some(_) => {
                    let array = existing_array(current).map_err(&cannot)?;
                    Some(Value::Array(
                        array.into_iter().filter(|e| !items.contains(e)).collect(),
                    ))
                }
            },
            Change::RemoveRelation(targets) => match current {
                None => None,
                Some(_) => {
                    let array = existing_array(current).map_err(&cannot)?;
                    Some(Value::Array(
                        array
                            .into_iter()
                            .filter(|e| !targets.iter().any(|t| refers_to(e, t)))
                            .collect(),
                    ))
                }
            },
        };

        Ok(next)
    }
}

fn existing_array(current: Option<&Value>) -> std::result::Result<Vec<Value>, String> {
    match current {
        None => Ok(Vec::new()),
        Some(Value::Array(items)) => Ok(items.clone()),
        Some(other) => Err(format!("field holds a {}, not an array", type_name(other))),
    }
}

fn refers_to(element: &Value, target: &RelationRef) -> bool {
    RelationRef::from_wire(element).as_ref() == Some(target)
}
