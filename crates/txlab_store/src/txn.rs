//! Transaction state and write staging.

use crate::error::{StoreError, StoreResult};
use crate::row::{RowWrite, WriteGuard};
use crate::types::{RowKey, SequenceNumber, TableId, TxnId};
use bytes::Bytes;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};

/// State of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxnState {
    /// Transaction is active and can stage operations.
    Active,
    /// Transaction has been committed.
    Committed,
    /// Transaction has been rolled back.
    RolledBack,
}

/// Visibility policy for reads inside a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IsolationLevel {
    /// Reads may observe other transactions' staged, uncommitted writes.
    ReadUncommitted,
    /// Reads observe the latest committed revision at the time of the read.
    #[default]
    ReadCommitted,
    /// Reads observe the committed state as of the transaction's begin.
    Serializable,
}

/// Options for beginning a transaction.
#[derive(Debug, Clone, Copy, Default)]
pub struct TxnOptions {
    /// Read visibility policy.
    pub isolation: IsolationLevel,
    /// Whether staging writes is forbidden.
    pub read_only: bool,
}

impl TxnOptions {
    /// Creates options with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the isolation level.
    #[must_use]
    pub const fn isolation(mut self, level: IsolationLevel) -> Self {
        self.isolation = level;
        self
    }

    /// Marks the transaction read-only.
    #[must_use]
    pub const fn read_only(mut self, value: bool) -> Self {
        self.read_only = value;
        self
    }
}

/// A watermark over a transaction's staged writes.
///
/// Rolling back to a savepoint discards only the writes staged after it,
/// leaving earlier staged writes (and any held locks) in place.
#[derive(Debug, Clone, Copy)]
pub struct Savepoint(usize);

/// An active store transaction.
///
/// Writes are staged in order and applied atomically at commit. The staged
/// write list is shared with the store so read-uncommitted readers can
/// observe it.
#[derive(Debug)]
pub struct StoreTxn {
    id: TxnId,
    isolation: IsolationLevel,
    read_only: bool,
    snapshot_seq: SequenceNumber,
    writes: Arc<Mutex<Vec<RowWrite>>>,
    state: TxnState,
}

impl StoreTxn {
    pub(crate) fn new(id: TxnId, options: TxnOptions, snapshot_seq: SequenceNumber) -> Self {
        Self {
            id,
            isolation: options.isolation,
            read_only: options.read_only,
            snapshot_seq,
            writes: Arc::new(Mutex::new(Vec::new())),
            state: TxnState::Active,
        }
    }

    /// Returns the transaction ID.
    #[must_use]
    pub fn id(&self) -> TxnId {
        self.id
    }

    /// Returns the isolation level.
    #[must_use]
    pub fn isolation(&self) -> IsolationLevel {
        self.isolation
    }

    /// Whether the transaction rejects writes.
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Returns the snapshot sequence captured at begin.
    #[must_use]
    pub fn snapshot_seq(&self) -> SequenceNumber {
        self.snapshot_seq
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> TxnState {
        self.state
    }

    /// Checks if the transaction is still active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state == TxnState::Active
    }

    /// Stages a write to be applied at commit.
    ///
    /// Fails with [`StoreError::ReadOnlyTxn`] on read-only transactions.
    pub fn stage_put(
        &mut self,
        table: TableId,
        key: RowKey,
        payload: Bytes,
        guard: WriteGuard,
    ) -> StoreResult<()> {
        self.ensure_active()?;
        if self.read_only {
            return Err(StoreError::ReadOnlyTxn);
        }
        self.writes.lock().push(RowWrite {
            table,
            key,
            payload,
            guard,
        });
        Ok(())
    }

    /// Returns the number of staged writes.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes.lock().len()
    }

    /// Places a savepoint at the current staging position.
    #[must_use]
    pub fn savepoint(&self) -> Savepoint {
        Savepoint(self.writes.lock().len())
    }

    /// Discards every write staged after the savepoint.
    pub fn rollback_to(&mut self, savepoint: Savepoint) -> StoreResult<()> {
        self.ensure_active()?;
        let mut writes = self.writes.lock();
        if savepoint.0 > writes.len() {
            return Err(StoreError::invalid_state(
                "savepoint is ahead of the staged write list",
            ));
        }
        writes.truncate(savepoint.0);
        Ok(())
    }

    /// Latest staged payload for a row, if this transaction wrote it.
    pub(crate) fn staged_payload(&self, table: TableId, key: RowKey) -> Option<Bytes> {
        self.writes
            .lock()
            .iter()
            .rev()
            .find(|w| w.table == table && w.key == key)
            .map(|w| w.payload.clone())
    }

    /// Drains the staged writes for commit.
    pub(crate) fn take_writes(&mut self) -> Vec<RowWrite> {
        std::mem::take(&mut *self.writes.lock())
    }

    /// Discards all staged writes.
    pub(crate) fn clear_writes(&self) {
        self.writes.lock().clear();
    }

    /// Handle for dirty-read visibility; dies with the transaction.
    pub(crate) fn shared_writes(&self) -> Weak<Mutex<Vec<RowWrite>>> {
        Arc::downgrade(&self.writes)
    }

    pub(crate) fn mark_committed(&mut self) {
        self.state = TxnState::Committed;
    }

    pub(crate) fn mark_rolled_back(&mut self) {
        self.state = TxnState::RolledBack;
    }

    pub(crate) fn ensure_active(&self) -> StoreResult<()> {
        match self.state {
            TxnState::Active => Ok(()),
            TxnState::Committed => Err(StoreError::invalid_state("transaction already committed")),
            TxnState::RolledBack => {
                Err(StoreError::invalid_state("transaction already rolled back"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_txn(options: TxnOptions) -> StoreTxn {
        StoreTxn::new(TxnId::new(1), options, SequenceNumber::new(0))
    }

    fn key(b: u8) -> RowKey {
        RowKey::from_bytes([b; 16])
    }

    #[test]
    fn new_transaction_is_active() {
        let txn = create_txn(TxnOptions::default());
        assert!(txn.is_active());
        assert_eq!(txn.state(), TxnState::Active);
        assert_eq!(txn.isolation(), IsolationLevel::ReadCommitted);
    }

    #[test]
    fn stage_put_records_write() {
        let mut txn = create_txn(TxnOptions::default());
        txn.stage_put(
            TableId::new(1),
            key(1),
            Bytes::from_static(b"a"),
            WriteGuard::Unchecked,
        )
        .unwrap();
        assert_eq!(txn.write_count(), 1);
        assert_eq!(
            txn.staged_payload(TableId::new(1), key(1)),
            Some(Bytes::from_static(b"a"))
        );
    }

    #[test]
    fn later_stage_wins() {
        let mut txn = create_txn(TxnOptions::default());
        let table = TableId::new(1);
        txn.stage_put(table, key(1), Bytes::from_static(b"a"), WriteGuard::Unchecked)
            .unwrap();
        txn.stage_put(table, key(1), Bytes::from_static(b"b"), WriteGuard::Unchecked)
            .unwrap();
        assert_eq!(txn.staged_payload(table, key(1)), Some(Bytes::from_static(b"b")));
    }

    #[test]
    fn read_only_rejects_writes() {
        let mut txn = create_txn(TxnOptions::new().read_only(true));
        let result = txn.stage_put(
            TableId::new(1),
            key(1),
            Bytes::from_static(b"a"),
            WriteGuard::Unchecked,
        );
        assert!(matches!(result, Err(StoreError::ReadOnlyTxn)));
        assert_eq!(txn.write_count(), 0);
    }

    #[test]
    fn cannot_stage_after_commit() {
        let mut txn = create_txn(TxnOptions::default());
        txn.mark_committed();
        let result = txn.stage_put(
            TableId::new(1),
            key(1),
            Bytes::from_static(b"a"),
            WriteGuard::Unchecked,
        );
        assert!(result.is_err());
    }

    #[test]
    fn savepoint_truncates_later_writes_only() {
        let mut txn = create_txn(TxnOptions::default());
        let table = TableId::new(1);
        txn.stage_put(table, key(1), Bytes::from_static(b"keep"), WriteGuard::Unchecked)
            .unwrap();
        let sp = txn.savepoint();
        txn.stage_put(table, key(2), Bytes::from_static(b"drop"), WriteGuard::Unchecked)
            .unwrap();
        txn.stage_put(table, key(3), Bytes::from_static(b"drop"), WriteGuard::Unchecked)
            .unwrap();

        txn.rollback_to(sp).unwrap();

        assert_eq!(txn.write_count(), 1);
        assert!(txn.staged_payload(table, key(1)).is_some());
        assert!(txn.staged_payload(table, key(2)).is_none());
    }

    #[test]
    fn rollback_to_stale_savepoint_fails() {
        let mut txn = create_txn(TxnOptions::default());
        let table = TableId::new(1);
        txn.stage_put(table, key(1), Bytes::from_static(b"a"), WriteGuard::Unchecked)
            .unwrap();
        let sp = txn.savepoint();
        let early = txn.savepoint();
        txn.rollback_to(early).unwrap();
        // Both savepoints sit at position 1; truncating twice is fine.
        txn.rollback_to(sp).unwrap();

        let mut other = create_txn(TxnOptions::default());
        let ahead = Savepoint(5);
        assert!(other.rollback_to(ahead).is_err());
    }

    #[test]
    fn isolation_option_carries_through() {
        let txn = create_txn(TxnOptions::new().isolation(IsolationLevel::Serializable));
        assert_eq!(txn.isolation(), IsolationLevel::Serializable);
    }
}
