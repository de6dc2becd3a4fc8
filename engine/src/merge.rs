//! Merging two operations on the same field.
//!
//! `incoming.merge(previous)` yields one operation with the effect of
//! applying `previous` and then `incoming`. Every pair of kinds is listed in
//! the dispatch table below; pairs without a sound single-operation form are
//! conflicts.
//!
//! | previous \ incoming | Set | Delete | Increment | Add | AddUnique | AddRelation | Remove | RemoveRelation |
//! |---|---|---|---|---|---|---|---|---|
//! | Set | Set | Delete | Set(sum) | Set(appended) | Set(unique-appended) | conflict | Set(removed) | conflict |
//! | Delete | Set | Delete | conflict | Add | AddUnique | AddRelation | Delete | Delete |
//! | Increment | Set | Delete | Increment(sum) | conflict | conflict | conflict | conflict | conflict |
//! | Add | Set | Delete | conflict | Add(concat) | conflict | conflict | Add(removed) | conflict |
//! | AddUnique | Set | Delete | conflict | conflict | AddUnique(union) | conflict | AddUnique(removed) | conflict |
//! | AddRelation | Set | Delete | conflict | conflict | conflict | AddRelation(union) | conflict | AddRelation(removed) |
//! | Remove | Set | Delete | conflict | Add if disjoint | conflict | conflict | Remove(union) | conflict |
//! | RemoveRelation | Set | Delete | conflict | conflict | conflict | AddRelation if disjoint | conflict | RemoveRelation(union) |

use crate::operation::{dedup_first_seen, is_wide_integer, push_unique, type_name};
use crate::{error::Result, Amount, Change, Error, Operation, OperationKind};
use serde_json::Value;

impl Operation {
    /// Merge `previous` (applied first) with `self` (applied second).
    pub fn merge(&self, previous: &Operation) -> Result<Operation> {
        if self.key() != previous.key() {
            return Err(Error::KeyMismatch {
                expected: previous.key().clone(),
                found: self.key().clone(),
            });
        }

        let key = self.key();
        let conflict =
            |reason: String| Error::conflict(key, previous.kind(), self.kind(), reason);

        let merged = match (previous.change(), self.change()) {
            // Set and Delete replace whatever came before.
            (_, Change::Set(_)) | (_, Change::Delete) => self.change().clone(),

            (Change::Set(value), Change::Increment(delta)) => {
                if is_wide_integer(value) {
                    return Err(Error::NumericOverflow(key.clone()));
                }
                let base = Amount::from_value(value).ok_or_else(|| {
                    conflict(format!("cannot increment a {}", type_name(value)))
                })?;
                let sum = base
                    .checked_add(*delta)
                    .ok_or_else(|| Error::NumericOverflow(key.clone()))?;
                Change::Set(sum.to_value())
            }
            (Change::Set(value), Change::Add(items)) => {
                let mut array = array_of(value).map_err(&conflict)?;
                array.extend(items.iter().cloned());
                Change::Set(Value::Array(array))
            }
            (Change::Set(value), Change::AddUnique(items)) => {
                let mut array = array_of(value).map_err(&conflict)?;
                for item in items {
                    push_unique(&mut array, item.clone());
                }
                Change::Set(Value::Array(array))
            }
            (Change::Set(value), Change::Remove(items)) => {
                let array = array_of(value).map_err(&conflict)?;
                Change::Set(Value::Array(without(array, items)))
            }

            (Change::Delete, Change::Increment(_)) => {
                return Err(conflict("cannot increment a deleted field".to_string()))
            }
            (Change::Delete, Change::Add(_))
            | (Change::Delete, Change::AddUnique(_))
            | (Change::Delete, Change::AddRelation(_)) => self.change().clone(),
            // Removing from an absent field changes nothing.
            (Change::Delete, Change::Remove(_)) | (Change::Delete, Change::RemoveRelation(_)) => {
                Change::Delete
            }

            (Change::Increment(a), Change::Increment(b)) => Change::Increment(
                a.checked_add(*b)
                    .ok_or_else(|| Error::NumericOverflow(key.clone()))?,
            ),

            (Change::Add(prev), Change::Add(next)) => {
                Change::Add(prev.iter().chain(next).cloned().collect())
            }
            (Change::Add(prev), Change::Remove(removed)) => {
                Change::Add(without(prev.clone(), removed))
            }

            (Change::AddUnique(prev), Change::AddUnique(next)) => {
                Change::AddUnique(union(prev, next))
            }
            (Change::AddUnique(prev), Change::Remove(removed)) => {
                Change::AddUnique(without(prev.clone(), removed))
            }

            (Change::AddRelation(prev), Change::AddRelation(next)) => {
                Change::AddRelation(union(prev, next))
            }
            (Change::AddRelation(prev), Change::RemoveRelation(removed)) => {
                Change::AddRelation(without(prev.clone(), removed))
            }

            (Change::Remove(prev), Change::Add(next)) => {
                if !disjoint(prev, next) {
                    return Err(conflict("re-adds an element removed earlier".to_string()));
                }
                self.change().clone()
            }
            (Change::Remove(prev), Change::Remove(next)) => Change::Remove(union(prev, next)),

            (Change::RemoveRelation(prev), Change::AddRelation(next)) => {
                if !disjoint(prev, next) {
                    return Err(conflict("re-links a relation removed earlier".to_string()));
                }
                self.change().clone()
            }
            (Change::RemoveRelation(prev), Change::RemoveRelation(next)) => {
                Change::RemoveRelation(union(prev, next))
            }

            _ => return Err(conflict(incompatibility(previous.kind(), self.kind()))),
        };

        Ok(self.with_change(merged))
    }
}

/// Families of operations that can compose with one another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Family {
    Absolute,
    Numeric,
    List,
    Relation,
}

impl Family {
    fn of(kind: OperationKind) -> Self {
        match kind {
            OperationKind::Set | OperationKind::Delete => Family::Absolute,
            OperationKind::Increment => Family::Numeric,
            OperationKind::Add | OperationKind::AddUnique | OperationKind::Remove => Family::List,
            OperationKind::AddRelation | OperationKind::RemoveRelation => Family::Relation,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Family::Absolute => "value",
            Family::Numeric => "numeric",
            Family::List => "list",
            Family::Relation => "relation",
        }
    }
}

fn incompatibility(previous: OperationKind, incoming: OperationKind) -> String {
    let (from, to) = (Family::of(previous), Family::of(incoming));
    if from == to {
        format!("mixed {} semantics", from.name())
    } else {
        format!("{} change on a pending {} change", to.name(), from.name())
    }
}

fn array_of(value: &Value) -> std::result::Result<Vec<Value>, String> {
    match value {
        Value::Array(items) => Ok(items.clone()),
        other => Err(format!("field holds a {}, not an array", type_name(other))),
    }
}

fn union<T: PartialEq + Clone>(prev: &[T], next: &[T]) -> Vec<T> {
    dedup_first_seen(prev.iter().chain(next).cloned().collect())
}

fn without<T: PartialEq>(items: Vec<T>, removed: &[T]) -> Vec<T> {
    items.into_iter().filter(|item| !removed.contains(item)).collect()
}

fn disjoint<T: PartialEq>(a: &[T], b: &[T]) -> bool {
    !a.iter().any(|item| b.contains(item))
}
