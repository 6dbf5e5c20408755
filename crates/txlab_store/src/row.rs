//! Row views and write staging types.

use crate::types::{RowKey, TableId, Version};
use bytes::Bytes;

/// A row as observed by a read: its payload and committed version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowView {
    /// Opaque payload bytes.
    pub payload: Bytes,
    /// Version counter at the time of the read.
    pub version: Version,
}

/// Concurrency guard attached to a staged write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteGuard {
    /// Apply unconditionally. Last committer wins; a concurrent update to
    /// the same row is silently overwritten.
    Unchecked,
    /// Apply only if the row's committed version still equals the given
    /// value when the transaction commits. Mismatch fails the commit with
    /// [`StoreError::VersionConflict`](crate::StoreError::VersionConflict).
    Expect(Version),
}

/// A staged write, buffered in the transaction until commit.
#[derive(Debug, Clone)]
pub(crate) struct RowWrite {
    pub(crate) table: TableId,
    pub(crate) key: RowKey,
    pub(crate) payload: Bytes,
    pub(crate) guard: WriteGuard,
}
