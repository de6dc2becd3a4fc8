//! Error types for the opledger engine.

use crate::{FieldKey, OperationKind};
use thiserror::Error;

/// All possible errors from the opledger engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Construction errors
    #[error("invalid field key: {0:?}")]
    InvalidKey(FieldKey),

    #[error("value type mismatch for {kind} on '{key}': expected {expected}, got {got}")]
    ValueTypeMismatch {
        kind: OperationKind,
        key: FieldKey,
        expected: String,
        got: String,
    },

    #[error("unknown operation: {0}")]
    UnknownOperation(String),

    // Merge errors
    #[error("operation conflict on '{key}': {incoming} cannot follow {previous} ({reason})")]
    OperationConflict {
        key: FieldKey,
        previous: OperationKind,
        incoming: OperationKind,
        reason: String,
    },

    #[error("key mismatch: expected '{expected}', found '{found}'")]
    KeyMismatch { expected: FieldKey, found: FieldKey },

    #[error("numeric overflow on '{0}'")]
    NumericOverflow(FieldKey),

    // Evaluation errors
    #[error("cannot apply {kind} to '{key}': {reason}")]
    CannotApply {
        key: FieldKey,
        kind: OperationKind,
        reason: String,
    },

    // State errors
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("transport failed: {0}")]
    Transport(String),
}

impl Error {
    pub(crate) fn conflict(
        key: &str,
        previous: OperationKind,
        incoming: OperationKind,
        reason: impl Into<String>,
    ) -> Self {
        Error::OperationConflict {
            key: key.to_string(),
            previous,
            incoming,
            reason: reason.into(),
        }
    }

    /// Whether this error came out of merging two staged operations.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::OperationConflict { .. })
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
