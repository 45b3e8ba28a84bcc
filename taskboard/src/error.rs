//! Error types for the board engine

use crate::position::PositionError;
use crate::store::EntityKind;
use crate::sync::SyncOperation;
use thiserror::Error;

/// Result type for board operations
pub type Result<T> = std::result::Result<T, BoardError>;

/// Result type for record store calls
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Errors surfaced to the UI layer
#[derive(Debug, Error)]
pub enum BoardError {
    /// Malformed, out-of-range or stale drag gesture. Nothing was mutated.
    #[error("invalid gesture: {reason}")]
    InvalidGesture { reason: String },

    /// A persistence call failed. The optimistic change was rolled back.
    #[error("remote write failed during {operation}: {source}")]
    RemoteWriteFailure {
        operation: SyncOperation,
        #[source]
        source: StoreError,
    },

    /// Loading the board failed. No partial board is produced.
    #[error("failed to load board: {source}")]
    RemoteReadFailure {
        #[source]
        source: StoreError,
    },

    /// List not present in the current board
    #[error("list not found: {id}")]
    ListNotFound { id: String },

    /// Task not present in the current board
    #[error("task not found: {id}")]
    TaskNotFound { id: String },

    /// A plan or record set that does not match the current state
    #[error("invariant violated: {message}")]
    Invariant { message: String },

    /// The background sync task ended without reporting
    #[error("sync task aborted: {message}")]
    SyncAborted { message: String },
}

impl BoardError {
    /// Create an invalid gesture error
    pub fn invalid_gesture(reason: impl Into<String>) -> Self {
        Self::InvalidGesture {
            reason: reason.into(),
        }
    }

    /// Create an invariant error
    pub fn invariant(message: impl Into<String>) -> Self {
        Self::Invariant {
            message: message.into(),
        }
    }

    /// Whether the user can simply repeat the action
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RemoteWriteFailure { source, .. } => source.is_retryable(),
            _ => false,
        }
    }
}

impl From<PositionError> for BoardError {
    fn from(error: PositionError) -> Self {
        Self::invalid_gesture(error.to_string())
    }
}

/// Errors reported by a record store backend
#[derive(Debug, Error)]
pub enum StoreError {
    /// No record with that key
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: String },

    /// The store refused the call (validation, conflict, permissions)
    #[error("rejected: {message}")]
    Rejected { message: String },

    /// The store could not be reached
    #[error("store unavailable: {message}")]
    Unavailable { message: String },

    /// The call did not complete in time
    #[error("timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    /// Lock is held by another process
    #[error("lock busy - another writer in progress")]
    LockBusy,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    pub fn not_found(kind: EntityKind, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Transient failures worth a manual retry
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Unavailable { .. } | Self::Timeout { .. } | Self::LockBusy
        )
    }
}
