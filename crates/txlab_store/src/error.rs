//! Error types for the record store.

use crate::types::{RowKey, TableId, Version};
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in record store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An optimistic write guard failed at commit: the row's committed
    /// version no longer matches the version observed at read time.
    #[error("version conflict on {key:?} in {table}: expected {expected}, found {found}")]
    VersionConflict {
        /// Table the conflicting row lives in.
        table: TableId,
        /// Key of the conflicting row.
        key: RowKey,
        /// Version the writer expected.
        expected: Version,
        /// Version actually committed.
        found: Version,
    },

    /// A write was staged on a read-only transaction.
    #[error("write staged on a read-only transaction")]
    ReadOnlyTxn,

    /// Operation not permitted in the transaction's current state.
    #[error("invalid transaction state: {message}")]
    InvalidState {
        /// Description of why the operation is invalid.
        message: String,
    },
}

impl StoreError {
    /// Creates an invalid state error.
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }
}
