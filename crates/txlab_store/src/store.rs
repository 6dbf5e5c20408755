//! The record store.

use crate::error::{StoreError, StoreResult};
use crate::locks::LockTable;
use crate::row::{RowView, RowWrite, WriteGuard};
use crate::txn::{IsolationLevel, StoreTxn, TxnOptions};
use crate::types::{RowKey, SequenceNumber, TableId, TxnId, Version};
use bytes::Bytes;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Weak;

/// One committed revision of a row.
#[derive(Debug, Clone)]
struct RowRevision {
    seq: SequenceNumber,
    version: Version,
    payload: Bytes,
}

/// Committed state: full revision history per row, plus the commit horizon.
#[derive(Debug, Default)]
struct StoreState {
    rows: HashMap<(TableId, RowKey), Vec<RowRevision>>,
    committed_seq: SequenceNumber,
}

impl StoreState {
    fn latest(&self, table: TableId, key: RowKey) -> Option<&RowRevision> {
        self.rows.get(&(table, key)).and_then(|revs| revs.last())
    }

    fn at_snapshot(
        &self,
        table: TableId,
        key: RowKey,
        snapshot: SequenceNumber,
    ) -> Option<&RowRevision> {
        self.rows
            .get(&(table, key))
            .and_then(|revs| revs.iter().rev().find(|r| r.seq <= snapshot))
    }

    fn committed_version(&self, table: TableId, key: RowKey) -> Version {
        self.latest(table, key).map_or(Version::NONE, |r| r.version)
    }
}

/// In-memory multi-versioned record store.
///
/// The store provides:
/// - Staged writes applied atomically at commit
/// - Per-row version counters, bumped once per committed update
/// - Optimistic guards validated against the committed version at commit
/// - Pessimistic row locks held until the owning transaction completes
/// - Isolation-level read paths (dirty, committed, snapshot)
///
/// Uncommitted writes live in the owning transaction's staged write list;
/// the store keeps a registry of those lists so `ReadUncommitted` readers
/// can observe them. A failed commit (guard violation) leaves the
/// transaction rolled back.
pub struct RecordStore {
    state: RwLock<StoreState>,
    /// Staged write lists of active transactions, for dirty reads.
    active: Mutex<HashMap<TxnId, Weak<Mutex<Vec<RowWrite>>>>>,
    locks: LockTable,
    next_txn: AtomicU64,
}

impl RecordStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: RwLock::new(StoreState::default()),
            active: Mutex::new(HashMap::new()),
            locks: LockTable::new(),
            next_txn: AtomicU64::new(1),
        }
    }

    /// Begins a new transaction.
    ///
    /// The snapshot sequence is captured here; `Serializable` reads are
    /// anchored to it for the transaction's lifetime.
    pub fn begin(&self, options: TxnOptions) -> StoreTxn {
        let id = TxnId::new(self.next_txn.fetch_add(1, Ordering::SeqCst));
        let snapshot_seq = self.state.read().committed_seq;
        let txn = StoreTxn::new(id, options, snapshot_seq);
        self.active.lock().insert(id, txn.shared_writes());
        tracing::debug!(%id, ?options, %snapshot_seq, "transaction begun");
        txn
    }

    /// Reads a row within a transaction.
    ///
    /// The transaction's own staged writes win; otherwise visibility follows
    /// the transaction's isolation level.
    pub fn read(
        &self,
        txn: &mut StoreTxn,
        table: TableId,
        key: RowKey,
    ) -> StoreResult<Option<RowView>> {
        txn.ensure_active()?;

        if let Some(payload) = txn.staged_payload(table, key) {
            let version = self.state.read().committed_version(table, key);
            return Ok(Some(RowView { payload, version }));
        }

        match txn.isolation() {
            IsolationLevel::ReadUncommitted => {
                if let Some(payload) = self.dirty_payload(txn.id(), table, key) {
                    let version = self.state.read().committed_version(table, key);
                    return Ok(Some(RowView { payload, version }));
                }
                Ok(self.read_latest(table, key))
            }
            IsolationLevel::ReadCommitted => Ok(self.read_latest(table, key)),
            IsolationLevel::Serializable => {
                let state = self.state.read();
                Ok(state
                    .at_snapshot(table, key, txn.snapshot_seq())
                    .map(|r| RowView {
                        payload: r.payload.clone(),
                        version: r.version,
                    }))
            }
        }
    }

    /// Reads the latest committed revision of a row, outside any transaction.
    #[must_use]
    pub fn read_latest(&self, table: TableId, key: RowKey) -> Option<RowView> {
        let state = self.state.read();
        state.latest(table, key).map(|r| RowView {
            payload: r.payload.clone(),
            version: r.version,
        })
    }

    /// Acquires the exclusive row lock for a transaction, blocking until free.
    ///
    /// The lock is released when the transaction commits or rolls back.
    pub fn lock_row(&self, txn: &StoreTxn, table: TableId, key: RowKey) -> StoreResult<()> {
        txn.ensure_active()?;
        self.locks.acquire(txn.id(), table, key);
        Ok(())
    }

    /// Commits a transaction.
    ///
    /// Every `Expect` guard is validated against the row's committed version
    /// under the state lock; on the first mismatch the transaction is rolled
    /// back and [`StoreError::VersionConflict`] returned. Otherwise the
    /// staged writes apply atomically (the last staged write per row wins)
    /// and each written row's version advances by one.
    pub fn commit(&self, txn: &mut StoreTxn) -> StoreResult<SequenceNumber> {
        txn.ensure_active()?;
        let writes = txn.take_writes();

        let mut state = self.state.write();
        for write in &writes {
            if let WriteGuard::Expect(expected) = write.guard {
                let found = state.committed_version(write.table, write.key);
                if found != expected {
                    drop(state);
                    self.finish(txn.id());
                    txn.mark_rolled_back();
                    tracing::debug!(id = %txn.id(), %expected, %found, "commit failed, rolled back");
                    return Err(StoreError::VersionConflict {
                        table: write.table,
                        key: write.key,
                        expected,
                        found,
                    });
                }
            }
        }

        // Coalesce to one effective write per row, preserving first-touch order.
        let mut order: Vec<(TableId, RowKey)> = Vec::new();
        let mut effective: HashMap<(TableId, RowKey), Bytes> = HashMap::new();
        for write in writes {
            if effective
                .insert((write.table, write.key), write.payload)
                .is_none()
            {
                order.push((write.table, write.key));
            }
        }

        let seq = state.committed_seq.next();
        for (table, key) in order {
            let Some(payload) = effective.remove(&(table, key)) else {
                continue;
            };
            let version = state.committed_version(table, key).next();
            state
                .rows
                .entry((table, key))
                .or_default()
                .push(RowRevision {
                    seq,
                    version,
                    payload,
                });
        }
        state.committed_seq = seq;
        drop(state);

        self.finish(txn.id());
        txn.mark_committed();
        tracing::debug!(id = %txn.id(), %seq, "transaction committed");
        Ok(seq)
    }

    /// Rolls back a transaction, discarding all staged writes.
    pub fn rollback(&self, txn: &mut StoreTxn) -> StoreResult<()> {
        txn.ensure_active()?;
        txn.clear_writes();
        self.finish(txn.id());
        txn.mark_rolled_back();
        tracing::debug!(id = %txn.id(), "transaction rolled back");
        Ok(())
    }

    /// Returns the current commit horizon.
    #[must_use]
    pub fn committed_seq(&self) -> SequenceNumber {
        self.state.read().committed_seq
    }

    /// Returns the number of registered active transactions.
    #[must_use]
    pub fn active_count(&self) -> usize {
        let mut active = self.active.lock();
        active.retain(|_, writes| writes.upgrade().is_some());
        active.len()
    }

    /// Unregisters a transaction and releases its locks.
    fn finish(&self, id: TxnId) {
        self.active.lock().remove(&id);
        self.locks.release_all(id);
    }

    /// Most recently staged payload for a row among other active transactions.
    fn dirty_payload(&self, reader: TxnId, table: TableId, key: RowKey) -> Option<Bytes> {
        let active = self.active.lock();
        for (&id, writes) in active.iter() {
            if id == reader {
                continue;
            }
            let Some(writes) = writes.upgrade() else {
                continue;
            };
            let found = writes
                .lock()
                .iter()
                .rev()
                .find(|w| w.table == table && w.key == key)
                .map(|w| w.payload.clone());
            if found.is_some() {
                return found;
            }
        }
        None
    }
}

impl Default for RecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStore")
            .field("committed_seq", &self.committed_seq())
            .field("active_count", &self.active_count())
            .finish_non_exhaustive()
    }
}
