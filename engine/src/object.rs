//! Lock-guarded ledger ownership and the synchronization cycle.
//!
//! A [`TrackedObject`] owns one [`OperationRecorder`] behind a mutex, so every
//! ledger call from any thread goes through a single exclusion boundary. Sync
//! cycles are serialized by a second mutex; appends stay possible while a
//! round trip is in flight and simply land in the untraced set.

use crate::{
    error::Result, payload::Payload, snapshot::LedgerSnapshot, Error, FieldKey, Operation,
    OperationKind, OperationRecorder, ReducedTable,
};
use serde_json::Value;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

/// The remote side of a round trip.
///
/// Implemented outside the engine; it receives the encoded request body and
/// reports whether the remote store accepted it.
pub trait Transport {
    /// What the remote store returns on success.
    type Outcome;
    /// Why a submission failed.
    type Error: fmt::Display;

    fn submit(&self, payload: &Payload) -> std::result::Result<Self::Outcome, Self::Error>;
}

/// Result of one sync cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncReport<T> {
    /// Nothing was staged; the transport was not called.
    UpToDate,
    /// The payload was accepted and the staged set cleared.
    Synced {
        /// Number of keys sent
        keys: usize,
        /// What the transport returned
        outcome: T,
    },
}

/// An object's ledger behind a lock.
#[derive(Debug, Default)]
pub struct TrackedObject {
    recorder: Mutex<OperationRecorder>,
    sync_lock: Mutex<()>,
}

impl TrackedObject {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore from a persisted ledger.
    pub fn from_snapshot(snapshot: LedgerSnapshot) -> Result<Self> {
        Ok(Self {
            recorder: Mutex::new(OperationRecorder::try_from(snapshot)?),
            sync_lock: Mutex::new(()),
        })
    }

    fn recorder(&self) -> MutexGuard<'_, OperationRecorder> {
        self.recorder.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a mutation.
    pub fn append(
        &self,
        kind: OperationKind,
        key: impl Into<FieldKey>,
        value: Option<Value>,
    ) -> Result<Operation> {
        self.recorder().append(kind, key, value).cloned()
    }

    /// Record an already constructed operation.
    pub fn append_operation(&self, operation: Operation) {
        self.recorder().append_operation(operation);
    }

    /// Promote untraced operations into the staged set.
    pub fn stage(&self) {
        self.recorder().stage();
    }

    /// Stage and reduce under the ledger lock.
    pub fn reduce(&self) -> Result<ReducedTable> {
        self.recorder().reduce()
    }

    /// Stage, reduce and encode under the ledger lock.
    ///
    /// For hosts that drive their own transport: send the payload, then call
    /// [`TrackedObject::clear_staged`] once it is accepted.
    pub fn payload(&self) -> Result<Payload> {
        self.recorder().payload()
    }

    /// Forget the staged set after the remote store accepted it.
    pub fn clear_staged(&self) {
        self.recorder().clear_staged();
    }

    /// Run `f` with read access to the ledger.
    pub fn with_recorder<R>(&self, f: impl FnOnce(&OperationRecorder) -> R) -> R {
        f(&self.recorder())
    }

    /// Every operation ever recorded.
    pub fn history(&self) -> Vec<Operation> {
        self.recorder().all().to_vec()
    }

    pub fn has_pending(&self) -> bool {
        self.recorder().has_pending()
    }

    pub fn export_state(&self) -> LedgerSnapshot {
        self.recorder().export_state()
    }

    /// Reduce, submit, and clear the staged set on success.
    ///
    /// The ledger lock is released while the transport runs. On any failure
    /// the staged set is left as it was, ready for the next attempt.
    pub fn sync<T: Transport>(&self, transport: &T) -> Result<SyncReport<T::Outcome>> {
        let _cycle = self.sync_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let payload = self.recorder().payload()?;
        if payload.is_empty() {
            debug!("nothing staged, skipping round trip");
            return Ok(SyncReport::UpToDate);
        }

        let keys = payload.len();
        debug!(keys, "submitting payload");
        let outcome = transport.submit(&payload).map_err(|e| {
            warn!(error = %e, "submission failed, keeping staged operations");
            Error::Transport(e.to_string())
        })?;

        self.recorder().clear_staged();
        debug!(keys, "round trip accepted");
        Ok(SyncReport::Synced { keys, outcome })
    }
}
