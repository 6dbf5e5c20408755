//! Record identifier.

use serde::{Deserialize, Serialize};
use std::fmt;
use txlab_store::RowKey;
use uuid::Uuid;

/// Unique identifier for a record.
///
/// Record IDs are UUIDs assigned by the data-access layer on insert and
/// immutable thereafter.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordId(Uuid);

impl RecordId {
    /// Creates a new random record ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a record ID from a UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Converts to a UUID.
    #[must_use]
    pub const fn to_uuid(self) -> Uuid {
        self.0
    }

    /// Returns the store key this record lives under.
    #[must_use]
    pub fn row_key(self) -> RowKey {
        RowKey::from_bytes(self.0.into_bytes())
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordId({})", self.0)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for RecordId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<RecordId> for Uuid {
    fn from(id: RecordId) -> Self {
        id.0
    }
}
