//! Pessimistic row locks.

use crate::types::{RowKey, TableId, TxnId};
use parking_lot::{Condvar, Mutex};
use std::collections::HashMap;

/// Row-level exclusive lock table.
///
/// A lock is held by a transaction from acquisition until the transaction
/// commits or rolls back. Acquisition blocks while another transaction holds
/// the lock; re-acquiring a lock the transaction already holds is a no-op.
///
/// Locks here are a discipline rather than a fence: only transactions that
/// ask for the lock wait on it. Writers that skip the lock must carry a
/// version guard instead.
#[derive(Debug, Default)]
pub(crate) struct LockTable {
    owners: Mutex<HashMap<(TableId, RowKey), TxnId>>,
    released: Condvar,
}

impl LockTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Acquires the exclusive lock on a row, blocking until it is free.
    pub(crate) fn acquire(&self, owner: TxnId, table: TableId, key: RowKey) {
        let mut owners = self.owners.lock();
        loop {
            match owners.get(&(table, key)) {
                None => {
                    owners.insert((table, key), owner);
                    tracing::debug!(%owner, %table, ?key, "row lock acquired");
                    return;
                }
                Some(&holder) if holder == owner => return,
                Some(&holder) => {
                    tracing::debug!(%owner, %holder, %table, ?key, "waiting for row lock");
                    self.released.wait(&mut owners);
                }
            }
        }
    }

    /// Releases every lock held by a transaction and wakes waiters.
    pub(crate) fn release_all(&self, owner: TxnId) {
        let mut owners = self.owners.lock();
        let before = owners.len();
        owners.retain(|_, holder| *holder != owner);
        if owners.len() != before {
            tracing::debug!(%owner, released = before - owners.len(), "row locks released");
            self.released.notify_all();
        }
    }

    /// Returns the transaction currently holding a row lock, if any.
    pub(crate) fn holder(&self, table: TableId, key: RowKey) -> Option<TxnId> {
        self.owners.lock().get(&(table, key)).copied()
    }
}
