//! Recorder - the per-object operation ledger.
//!
//! Every recorded operation is kept in `all` forever. New operations start
//! untraced; `stage` promotes them into the staged set, which is what gets
//! reduced and sent. `clear_staged` drops the staged set once the remote side
//! has accepted it.

use crate::{
    error::Result,
    payload::{self, Payload},
    snapshot::LedgerSnapshot,
    Error, FieldKey, Operation, OperationKind, ReducedTable, Reducer,
};
use serde_json::Value;
use tracing::{debug, trace, warn};

/// Operation ledger owned by a single object.
///
/// `untraced` and `staged` hold positions into `all`; both are kept in
/// ascending order and never share a position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OperationRecorder {
    /// Every operation ever recorded
    all: Vec<Operation>,
    /// Recorded since the last stage
    untraced: Vec<usize>,
    /// Promoted for reduction, awaiting a round trip
    staged: Vec<usize>,
}

impl OperationRecorder {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a mutation.
    ///
    /// Fails with `ValueTypeMismatch` if `value` does not fit `kind`, in which
    /// case nothing is recorded.
    pub fn append(
        &mut self,
        kind: OperationKind,
        key: impl Into<FieldKey>,
        value: Option<Value>,
    ) -> Result<&Operation> {
        let operation = Operation::new(kind, key, value)?;
        Ok(self.append_operation(operation))
    }

    /// Record an already constructed operation.
    pub fn append_operation(&mut self, operation: Operation) -> &Operation {
        trace!(key = %operation.key(), kind = %operation.kind(), "recording operation");
        let position = self.all.len();
        self.all.push(operation);
        self.untraced.push(position);
        &self.all[position]
    }

    /// Move every untraced operation to the end of the staged set.
    pub fn stage(&mut self) {
        if self.untraced.is_empty() {
            return;
        }
        debug!(count = self.untraced.len(), "staging operations");
        self.staged.append(&mut self.untraced);
    }

    /// Stage pending operations and reduce the staged set.
    ///
    /// The staged set itself is not modified, so a failed or abandoned round
    /// trip can reduce again with the same result.
    pub fn reduce(&mut self) -> Result<ReducedTable> {
        self.stage();
        let table = Reducer::reduce(self.staged()).inspect_err(|err| {
            warn!(error = %err, staged = self.staged.len(), "reduction failed");
        })?;
        debug!(
            staged = self.staged.len(),
            keys = table.len(),
            "reduced staged operations"
        );
        Ok(table)
    }

    /// Reduce and encode as a request body.
    pub fn payload(&mut self) -> Result<Payload> {
        Ok(payload::encode(&self.reduce()?))
    }

    /// Forget the staged set after a successful round trip.
    ///
    /// Untraced operations recorded meanwhile stay pending.
    pub fn clear_staged(&mut self) {
        debug!(count = self.staged.len(), "clearing staged operations");
        self.staged.clear();
    }

    /// Every operation ever recorded, oldest first.
    pub fn all(&self) -> &[Operation] {
        &self.all
    }

    /// Staged operations, oldest first.
    pub fn staged(&self) -> impl Iterator<Item = &Operation> + '_ {
        self.staged.iter().map(|&i| &self.all[i])
    }

    /// Untraced operations, oldest first.
    pub fn untraced(&self) -> impl Iterator<Item = &Operation> + '_ {
        self.untraced.iter().map(|&i| &self.all[i])
    }

    pub fn staged_count(&self) -> usize {
        self.staged.len()
    }

    pub fn untraced_count(&self) -> usize {
        self.untraced.len()
    }

    /// Whether anything is waiting to be sent.
    pub fn has_pending(&self) -> bool {
        !self.staged.is_empty() || !self.untraced.is_empty()
    }

    /// Export the ledger as a snapshot.
    pub fn export_state(&self) -> LedgerSnapshot {
        LedgerSnapshot::new(self.all.clone(), self.untraced.clone(), self.staged.clone())
    }

    /// Replace this ledger with the contents of a snapshot.
    pub fn import_state(&mut self, snapshot: LedgerSnapshot) -> Result<()> {
        snapshot.validate()?;
        *self = Self::from_snapshot_parts(snapshot);
        Ok(())
    }

    fn from_snapshot_parts(snapshot: LedgerSnapshot) -> Self {
        Self {
            all: snapshot.operations,
            untraced: snapshot.untraced,
            staged: snapshot.staged,
        }
    }
}

impl TryFrom<LedgerSnapshot> for OperationRecorder {
    type Error = Error;

    fn try_from(snapshot: LedgerSnapshot) -> Result<Self> {
        snapshot.validate()?;
        Ok(Self::from_snapshot_parts(snapshot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Amount, Change, RelationRef};
    use serde_json::json;

    #[test]
    fn append_records_untraced() {
        let mut recorder = OperationRecorder::new();
        let op = recorder
            .append(OperationKind::Set, "name", Some(json!("Ann")))
            .unwrap();
        assert_eq!(op.key(), "name");

        assert_eq!(recorder.all().len(), 1);
        assert_eq!(recorder.untraced_count(), 1);
        assert_eq!(recorder.staged_count(), 0);
        assert!(recorder.has_pending());
    }

    #[test]
    fn append_mismatch_leaves_ledger_untouched() {
        let mut recorder = OperationRecorder::new();
        let err = recorder
            .append(OperationKind::Increment, "age", Some(json!("one")))
            .unwrap_err();
        assert!(matches!(err, Error::ValueTypeMismatch { .. }));
        assert!(recorder.all().is_empty());
        assert!(!recorder.has_pending());
    }

    #[test]
    fn stage_moves_untraced() {
        let mut recorder = OperationRecorder::new();
        recorder.append(OperationKind::Increment, "a", Some(json!(1))).unwrap();
        recorder.append(OperationKind::Increment, "b", Some(json!(1))).unwrap();

        recorder.stage();
        assert_eq!(recorder.untraced_count(), 0);
        assert_eq!(recorder.staged_count(), 2);

        // Idempotent when nothing is untraced
        recorder.stage();
        assert_eq!(recorder.staged_count(), 2);

        let keys: Vec<_> = recorder.staged().map(|op| op.key().as_str()).collect();
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[test]
    fn end_to_end_cycle() {
        let mut recorder = OperationRecorder::new();
        recorder.append(OperationKind::Set, "name", Some(json!("Ann"))).unwrap();
        recorder.append(OperationKind::Increment, "age", Some(json!(1))).unwrap();
        recorder.stage();
        recorder.append(OperationKind::Increment, "age", Some(json!(2))).unwrap();

        // reduce() stages the second increment before folding
        let table = recorder.reduce().unwrap();
        assert_eq!(table.get("name").unwrap().change(), &Change::Set(json!("Ann")));
        assert_eq!(
            table.get("age").unwrap().change(),
            &Change::Increment(Amount::Int(3))
        );
        assert_eq!(recorder.untraced_count(), 0);
        assert_eq!(recorder.staged_count(), 3);
    }

    #[test]
    fn reduce_is_idempotent() {
        let mut recorder = OperationRecorder::new();
        recorder.append(OperationKind::Increment, "n", Some(json!(1))).unwrap();
        recorder.append(OperationKind::Increment, "n", Some(json!(2))).unwrap();

        let first = recorder.reduce().unwrap();
        let second = recorder.reduce().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn clear_staged_keeps_untraced_and_history() {
        let mut recorder = OperationRecorder::new();
        recorder.append(OperationKind::Set, "name", Some(json!("Ann"))).unwrap();
        recorder.reduce().unwrap();

        // Recorded while the round trip is in flight
        recorder.append(OperationKind::Set, "email", Some(json!("a@b.c"))).unwrap();
        recorder.clear_staged();

        assert_eq!(recorder.staged_count(), 0);
        assert_eq!(recorder.untraced_count(), 1);
        assert_eq!(recorder.all().len(), 2);

        let table = recorder.reduce().unwrap();
        assert_eq!(table.len(), 1);
        assert!(table.contains_key("email"));
        assert!(!table.contains_key("name"));
    }

    #[test]
    fn conflict_leaves_staged_intact() {
        let mut recorder = OperationRecorder::new();
        recorder.append(OperationKind::Increment, "f", Some(json!(1))).unwrap();
        recorder
            .append_operation(Operation::add_relation("f", vec![RelationRef::new("C", "1")]).unwrap());

        let err = recorder.reduce().unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(recorder.staged_count(), 2);
        assert_eq!(recorder.all().len(), 2);
    }

    #[test]
    fn payload_encodes_reduction() {
        let mut recorder = OperationRecorder::new();
        recorder.append(OperationKind::Delete, "avatar", None).unwrap();
        recorder
            .append(OperationKind::AddUnique, "tags", Some(json!(["a", "a"])))
            .unwrap();

        let payload = recorder.payload().unwrap();
        assert_eq!(
            Value::Object(payload),
            json!({
                "avatar": {"__op": "Delete"},
                "tags": {"__op": "AddUnique", "objects": ["a"]},
            })
        );
    }

    #[test]
    fn export_import_roundtrip() {
        let mut recorder = OperationRecorder::new();
        recorder.append(OperationKind::Set, "a", Some(json!(1))).unwrap();
        recorder.stage();
        recorder.append(OperationKind::Set, "b", Some(json!(2))).unwrap();

        let snapshot = recorder.export_state();
        let mut restored = OperationRecorder::new();
        restored.import_state(snapshot.clone()).unwrap();
        assert_eq!(restored, recorder);

        let converted = OperationRecorder::try_from(snapshot).unwrap();
        assert_eq!(converted.staged_count(), 1);
        assert_eq!(converted.untraced_count(), 1);
    }
}
