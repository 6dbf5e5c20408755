//! Explicit detached-association marker.

use crate::boundary::BoundaryToken;
use crate::codec::RecordCodec;
use crate::error::{CoreError, CoreResult};
use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, Weak};
use txlab_store::{RecordStore, RowKey, TableId};

/// An association that was either fetched eagerly or left deferred.
///
/// There is no silent deferred I/O: a deferred association is an explicit
/// handle tied to the boundary that produced it. Accessing it while the
/// boundary is still open loads the record on demand; accessing it after
/// the boundary closed fails with [`CoreError::StaleAccess`].
pub enum Lazy<T> {
    /// Fetched together with its owner; always accessible.
    Loaded(T),
    /// Deferred; accessible only while the owning boundary is open.
    Deferred(Deferred<T>),
}

impl<T: RecordCodec + Clone> Lazy<T> {
    /// Returns the association value.
    ///
    /// Loads deferred associations from the store; fails with
    /// [`CoreError::StaleAccess`] if the owning boundary has closed.
    pub fn get(&self) -> CoreResult<T> {
        match self {
            Self::Loaded(value) => Ok(value.clone()),
            Self::Deferred(handle) => handle.load(),
        }
    }
}

impl<T> Lazy<T> {
    /// Whether the association was fetched eagerly.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }
}

impl<T: fmt::Debug> fmt::Debug for Lazy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Loaded(value) => f.debug_tuple("Loaded").field(value).finish(),
            Self::Deferred(handle) => handle.fmt(f),
        }
    }
}

/// Handle for a deferred association.
///
/// Holds a weak reference to the owning boundary's liveness token; once the
/// boundary completes the handle is detached for good.
pub struct Deferred<T> {
    store: Arc<RecordStore>,
    table: TableId,
    key: RowKey,
    owner: Weak<BoundaryToken>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Deferred<T> {
    pub(crate) fn new(
        store: Arc<RecordStore>,
        table: TableId,
        key: RowKey,
        owner: Weak<BoundaryToken>,
    ) -> Self {
        Self {
            store,
            table,
            key,
            owner,
            _marker: PhantomData,
        }
    }

    /// Whether the owning boundary is still open.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.owner.upgrade().is_some()
    }
}

impl<T: RecordCodec> Deferred<T> {
    /// Loads the association record.
    fn load(&self) -> CoreResult<T> {
        if !self.is_attached() {
            return Err(CoreError::StaleAccess);
        }
        let row = self
            .store
            .read_latest(self.table, self.key)
            .ok_or_else(|| CoreError::not_found(self.table, self.key))?;
        T::decode(&row.payload)
    }
}

impl<T> fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deferred")
            .field("table", &self.table)
            .field("key", &self.key)
            .field("attached", &self.is_attached())
            .finish_non_exhaustive()
    }
}
