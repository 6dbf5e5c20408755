//! Error taxonomy and failure categories.

use thiserror::Error;
use txlab_store::{RowKey, StoreError, TableId, Version};

/// Result type for boundary and repository operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors surfaced by boundaries, repositories, and scenario bodies.
#[derive(Debug, Error)]
pub enum CoreError {
    /// No record exists under the given identifier.
    #[error("record not found: {key:?} in {table}")]
    NotFound {
        /// Table that was searched.
        table: TableId,
        /// Key that was not found.
        key: RowKey,
    },

    /// A deferred association was touched after its owning boundary closed.
    #[error("stale access: deferred association touched outside its owning boundary")]
    StaleAccess,

    /// A version-guarded write found the record changed since it was read.
    #[error("optimistic conflict: expected {expected}, found {found}")]
    OptimisticConflict {
        /// Version the writer read.
        expected: Version,
        /// Version committed in the meantime.
        found: Version,
    },

    /// A write was attempted under a read-only boundary.
    #[error("read-only violation: write attempted under a read-only boundary")]
    ReadOnlyViolation,

    /// A recoverable failure. Does not force rollback under the default
    /// rollback rule.
    #[error("recoverable failure: {message}")]
    Recoverable {
        /// Description of the failure.
        message: String,
    },

    /// A fatal failure. Always forces rollback.
    #[error("fatal failure: {message}")]
    Fatal {
        /// Description of the failure.
        message: String,
    },

    /// Payload encoding or decoding failed.
    #[error("codec error: {message}")]
    Codec {
        /// Description of the codec failure.
        message: String,
    },

    /// Any other store-level error.
    #[error("store error: {0}")]
    Store(StoreError),
}

/// The two rollback-policy categories.
///
/// Rollback rules decide by category, not by concrete error: the default
/// rule forces rollback only for [`FailureCategory::Fatal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCategory {
    /// The caller can reasonably continue; committed work may be kept.
    Recoverable,
    /// The unit of work is compromised and must be undone.
    Fatal,
}

impl CoreError {
    /// Creates a not-found error.
    pub fn not_found(table: TableId, key: RowKey) -> Self {
        Self::NotFound { table, key }
    }

    /// Creates a recoverable failure.
    pub fn recoverable(message: impl Into<String>) -> Self {
        Self::Recoverable {
            message: message.into(),
        }
    }

    /// Creates a fatal failure.
    pub fn fatal(message: impl Into<String>) -> Self {
        Self::Fatal {
            message: message.into(),
        }
    }

    /// Creates a codec error.
    pub fn codec(message: impl Into<String>) -> Self {
        Self::Codec {
            message: message.into(),
        }
    }

    /// Returns the rollback-policy category of this error.
    #[must_use]
    pub fn category(&self) -> FailureCategory {
        match self {
            Self::Recoverable { .. } => FailureCategory::Recoverable,
            _ => FailureCategory::Fatal,
        }
    }
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::VersionConflict {
                expected, found, ..
            } => Self::OptimisticConflict { expected, found },
            StoreError::ReadOnlyTxn => Self::ReadOnlyViolation,
            other => Self::Store(other),
        }
    }
}
