//! # txlab Store
//!
//! In-memory transactional record store for the txlab workspace.
//!
//! The store plays the role of an external relational engine: it provides
//! begin/commit/rollback, per-row version counters for optimistic conflict
//! detection, row-level pessimistic locks, and isolation-level read paths.
//! It holds **opaque byte payloads**: encoding and meaning belong to the
//! layers above.
//!
//! ## Design Principles
//!
//! - Rows are byte payloads keyed by `(TableId, RowKey)`; the store never
//!   interprets them
//! - Every committed update bumps the row's [`Version`] by exactly one
//! - Writes are staged in the transaction and applied atomically at commit
//! - Locking is a discipline, not a fence: callers must either hold the row
//!   lock or supply the expected version on write
//!
//! ## Example
//!
//! ```rust
//! use txlab_store::{RecordStore, RowKey, TableId, TxnOptions, WriteGuard};
//! use bytes::Bytes;
//!
//! let store = RecordStore::new();
//! let table = TableId::new(1);
//! let key = RowKey::from_bytes([7; 16]);
//!
//! let mut txn = store.begin(TxnOptions::default());
//! txn.stage_put(table, key, Bytes::from_static(b"payload"), WriteGuard::Unchecked)
//!     .unwrap();
//! store.commit(&mut txn).unwrap();
//!
//! let row = store.read_latest(table, key).unwrap();
//! assert_eq!(row.version.as_u64(), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod locks;
mod row;
mod store;
mod txn;
mod types;

pub use error::{StoreError, StoreResult};
pub use row::{RowView, WriteGuard};
pub use store::RecordStore;
pub use txn::{IsolationLevel, Savepoint, StoreTxn, TxnOptions, TxnState};
pub use types::{RowKey, SequenceNumber, TableId, TxnId, Version};
