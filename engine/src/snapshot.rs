//! Snapshot types for persisting and restoring a ledger.
//!
//! A snapshot carries the full operation history plus the positions of the
//! untraced and staged operations, so a staged set that was never
//! acknowledged survives a restart and can be retried as is.

use crate::{error::Result, Error, Operation};
use serde::{Deserialize, Serialize};

/// Version of the snapshot format for future compatibility.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// A point-in-time copy of an operation ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerSnapshot {
    /// Snapshot format version
    pub format_version: u32,
    /// Every recorded operation, oldest first
    pub operations: Vec<Operation>,
    /// Positions of untraced operations
    pub untraced: Vec<usize>,
    /// Positions of staged operations
    pub staged: Vec<usize>,
}

/// Summary of a ledger without the operations themselves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotMetadata {
    pub format_version: u32,
    pub operation_count: usize,
    pub untraced_count: usize,
    pub staged_count: usize,
}

impl LedgerSnapshot {
    /// Create a snapshot from its parts.
    pub fn new(operations: Vec<Operation>, untraced: Vec<usize>, staged: Vec<usize>) -> Self {
        Self {
            format_version: SNAPSHOT_FORMAT_VERSION,
            operations,
            untraced,
            staged,
        }
    }

    /// Summary counts.
    pub fn metadata(&self) -> SnapshotMetadata {
        SnapshotMetadata {
            format_version: self.format_version,
            operation_count: self.operations.len(),
            untraced_count: self.untraced.len(),
            staged_count: self.staged.len(),
        }
    }

    /// Check the ledger invariants.
    ///
    /// Positions must be in range and strictly increasing, no position may be
    /// both untraced and staged, and every staged operation must precede every
    /// untraced one. Operations are checked on deserialization.
    pub fn validate(&self) -> Result<()> {
        if self.format_version > SNAPSHOT_FORMAT_VERSION {
            return Err(Error::InvalidSnapshot(format!(
                "unsupported snapshot format version: {} (max supported: {})",
                self.format_version, SNAPSHOT_FORMAT_VERSION
            )));
        }

        let len = self.operations.len();
        for (name, positions) in [("untraced", &self.untraced), ("staged", &self.staged)] {
            if let Some(&bad) = positions.iter().find(|&&p| p >= len) {
                return Err(Error::InvalidSnapshot(format!(
                    "{name} position {bad} out of range ({len} operations)"
                )));
            }
            if positions.windows(2).any(|w| w[0] >= w[1]) {
                return Err(Error::InvalidSnapshot(format!(
                    "{name} positions are not strictly increasing"
                )));
            }
        }

        if let Some(shared) = self.untraced.iter().find(|&&p| self.staged.contains(&p)) {
            return Err(Error::InvalidSnapshot(format!(
                "position {shared} is both untraced and staged"
            )));
        }

        if let (Some(&last_staged), Some(&first_untraced)) =
            (self.staged.last(), self.untraced.first())
        {
            if last_staged >= first_untraced {
                return Err(Error::InvalidSnapshot(format!(
                    "staged position {last_staged} follows untraced position {first_untraced}"
                )));
            }
        }

        Ok(())
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::InvalidSnapshot(e.to_string()))
    }

    /// Serialize to pretty JSON.
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::InvalidSnapshot(e.to_string()))
    }

    /// Deserialize from JSON and validate.
    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: Self =
            serde_json::from_str(json).map_err(|e| Error::InvalidSnapshot(e.to_string()))?;
        snapshot.validate()?;
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ops(n: usize) -> Vec<Operation> {
        (0..n)
            .map(|i| Operation::set(format!("f{i}"), json!(i)).unwrap())
            .collect()
    }

    #[test]
    fn json_roundtrip() {
        let snapshot = LedgerSnapshot::new(ops(3), vec![2], vec![0, 1]);
        let json = snapshot.to_json().unwrap();
        let parsed = LedgerSnapshot::from_json(&json).unwrap();
        assert_eq!(parsed, snapshot);

        let pretty = snapshot.to_json_pretty().unwrap();
        assert!(pretty.contains("formatVersion"));
    }

    #[test]
    fn metadata_counts() {
        let meta = LedgerSnapshot::new(ops(3), vec![2], vec![0, 1]).metadata();
        assert_eq!(meta.operation_count, 3);
        assert_eq!(meta.untraced_count, 1);
        assert_eq!(meta.staged_count, 2);
    }

    #[test]
    fn rejects_out_of_range() {
        let err = LedgerSnapshot::new(ops(1), vec![1], vec![])
            .validate()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidSnapshot(_)));
    }

    #[test]
    fn rejects_overlap() {
        let err = LedgerSnapshot::new(ops(2), vec![1], vec![0, 1])
            .validate()
            .unwrap_err();
        assert_eq!(
            err,
            Error::InvalidSnapshot("position 1 is both untraced and staged".into())
        );
    }

    #[test]
    fn rejects_unordered() {
        let err = LedgerSnapshot::new(ops(2), vec![], vec![1, 0])
            .validate()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidSnapshot(_)));
    }

    #[test]
    fn rejects_untraced_before_staged() {
        let err = LedgerSnapshot::new(ops(2), vec![0], vec![1])
            .validate()
            .unwrap_err();
        assert_eq!(
            err,
            Error::InvalidSnapshot("staged position 1 follows untraced position 0".into())
        );
    }

    #[test]
    fn restored_ledger_folds_in_append_order() {
        let operations = vec![
            Operation::set("n", json!(1)).unwrap(),
            Operation::increment("n", 5).unwrap(),
        ];
        let snapshot = LedgerSnapshot::new(operations, vec![1], vec![0]);
        let mut recorder = crate::OperationRecorder::try_from(snapshot).unwrap();
        let table = recorder.reduce().unwrap();
        assert_eq!(table.get("n").unwrap().change(), &crate::Change::Set(json!(6)));

        let reversed = LedgerSnapshot::new(
            vec![
                Operation::set("n", json!(1)).unwrap(),
                Operation::increment("n", 5).unwrap(),
            ],
            vec![0],
            vec![1],
        );
        assert!(crate::OperationRecorder::try_from(reversed).is_err());
    }

    #[test]
    fn normalizes_imported_operations() {
        let json = r#"{
            "formatVersion": 1,
            "operations": [{"key": "tags", "change": {"kind": "AddUnique", "value": ["a", "a", "b"]}}],
            "untraced": [],
            "staged": [0]
        }"#;
        let snapshot = LedgerSnapshot::from_json(json).unwrap();
        let mut recorder = crate::OperationRecorder::try_from(snapshot).unwrap();
        let table = recorder.reduce().unwrap();
        assert_eq!(
            table.get("tags").unwrap().change(),
            &crate::Change::AddUnique(vec![json!("a"), json!("b")])
        );
    }

    #[test]
    fn rejects_incomplete_relation() {
        let json = r#"{
            "formatVersion": 1,
            "operations": [{"key": "likes", "change": {"kind": "AddRelation", "value": [{"className": "", "objectId": "p1"}]}}],
            "untraced": [0],
            "staged": []
        }"#;
        assert!(matches!(
            LedgerSnapshot::from_json(json),
            Err(Error::InvalidSnapshot(_))
        ));
    }

    #[test]
    fn rejects_future_format() {
        let mut snapshot = LedgerSnapshot::new(ops(0), vec![], vec![]);
        snapshot.format_version = SNAPSHOT_FORMAT_VERSION + 1;
        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(LedgerSnapshot::from_json(&json).is_err());
    }

    #[test]
    fn rejects_empty_key() {
        let json = r#"{
            "formatVersion": 1,
            "operations": [{"key": "", "change": {"kind": "Delete"}}],
            "untraced": [0],
            "staged": []
        }"#;
        assert!(matches!(
            LedgerSnapshot::from_json(json),
            Err(Error::InvalidSnapshot(_))
        ));
    }
}
