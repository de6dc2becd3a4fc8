//! Reduction of an ordered operation sequence into one operation per field.
//!
//! # Algorithm
//!
//! Left fold in insertion order: the first operation on a key is taken as is,
//! every later one is merged on top of the entry already in the table. A
//! single failed merge fails the whole reduction.

use crate::{error::Result, FieldKey, Operation};
use serde::Serialize;
use std::collections::btree_map::{self, Entry};
use std::collections::BTreeMap;

/// Canonical operation per field key.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ReducedTable {
    entries: BTreeMap<FieldKey, Operation>,
}

impl ReducedTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the canonical operation for a key.
    pub fn get(&self, key: &str) -> Option<&Operation> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &FieldKey> {
        self.entries.keys()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, FieldKey, Operation> {
        self.entries.iter()
    }

    /// Fold one more operation into the table.
    pub fn absorb(&mut self, operation: &Operation) -> Result<()> {
        match self.entries.entry(operation.key().clone()) {
            Entry::Vacant(slot) => {
                slot.insert(operation.clone());
            }
            Entry::Occupied(mut slot) => {
                let merged = operation.merge(slot.get())?;
                slot.insert(merged);
            }
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a ReducedTable {
    type Item = (&'a FieldKey, &'a Operation);
    type IntoIter = btree_map::Iter<'a, FieldKey, Operation>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl IntoIterator for ReducedTable {
    type Item = (FieldKey, Operation);
    type IntoIter = btree_map::IntoIter<FieldKey, Operation>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Stateless reducer.
#[derive(Debug, Clone, Copy, Default)]
pub struct Reducer;

impl Reducer {
    /// Reduce `operations`, in order, to a table of canonical operations.
    pub fn reduce<'a, I>(operations: I) -> Result<ReducedTable>
    where
        I: IntoIterator<Item = &'a Operation>,
    {
        let mut table = ReducedTable::new();
        for operation in operations {
            table.absorb(operation)?;
        }
        Ok(table)
    }
}
