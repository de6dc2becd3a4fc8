//! # Opledger Engine
//!
//! Field-level operation tracking and merge reduction for client object
//! models.
//!
//! An object model records every field mutation as an [`Operation`]. Before a
//! save, pending operations are staged and folded into one canonical
//! operation per field, which is then encoded as the request body sent to the
//! remote store.
//!
//! ## Design Principles
//!
//! - **No IO**: The engine never touches the network; a [`Transport`] does
//! - **Deterministic**: Same operation sequence, same reduced table
//! - **Loud conflicts**: Operations that cannot be combined fail the
//!   reduction instead of dropping information
//! - **Portable**: Plain Rust plus a C ABI in [`ffi`]
//!
//! ## Core Concepts
//!
//! ### Operations
//!
//! Eight kinds, see [`OperationKind`]: `Set`, `Delete`, `Increment`, `Add`,
//! `AddUnique`, `AddRelation`, `Remove` and `RemoveRelation`. Payload shapes
//! are checked at construction.
//!
//! ### Merging and Reduction
//!
//! [`Operation::merge`] combines an operation with the one before it on the
//! same field. The [`Reducer`] folds a sequence with it into a
//! [`ReducedTable`].
//!
//! ### The Ledger
//!
//! [`OperationRecorder`] keeps the full history plus the untraced and staged
//! partitions. [`TrackedObject`] puts it behind a lock and drives the
//! reduce, submit, clear cycle.
//!
//! ## Quick Start
//!
//! ```rust
//! use opledger_engine::{OperationKind, OperationRecorder};
//! use serde_json::json;
//!
//! let mut recorder = OperationRecorder::new();
//! recorder.append(OperationKind::Set, "name", Some(json!("Ann"))).unwrap();
//! recorder.append(OperationKind::Increment, "age", Some(json!(1))).unwrap();
//! recorder.append(OperationKind::Increment, "age", Some(json!(2))).unwrap();
//!
//! let payload = recorder.payload().unwrap();
//! assert_eq!(payload["name"], json!("Ann"));
//! assert_eq!(payload["age"], json!({"__op": "Increment", "amount": 3}));
//!
//! // After the remote store accepted the payload
//! recorder.clear_staged();
//! assert!(!recorder.has_pending());
//! ```
//!
//! ## Persistence
//!
//! Use [`OperationRecorder::export_state`] and
//! [`OperationRecorder::import_state`] with [`LedgerSnapshot`] to keep an
//! unacknowledged staged set across restarts.

pub mod apply;
pub mod error;
pub mod ffi;
pub mod merge;
pub mod object;
pub mod operation;
pub mod payload;
pub mod recorder;
pub mod reducer;
pub mod relation;
pub mod snapshot;

// Re-export main types at crate root
pub use error::Error;
pub use object::{SyncReport, TrackedObject, Transport};
pub use operation::{Amount, Change, Operation, OperationKind};
pub use payload::{Payload, OP_FIELD};
pub use recorder::OperationRecorder;
pub use reducer::{ReducedTable, Reducer};
pub use relation::RelationRef;
pub use snapshot::{LedgerSnapshot, SnapshotMetadata, SNAPSHOT_FORMAT_VERSION};

/// Name of an object attribute.
pub type FieldKey = String;
