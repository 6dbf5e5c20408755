//! Explicit transaction boundaries.
//!
//! A boundary is obtained only through [`BoundaryRunner::execute`]: it opens
//! (or joins) a store transaction according to a [`BoundaryConfig`], runs the
//! body, and guarantees commit-or-rollback on every exit path. There is no
//! interception of plain function calls: invoking an operation's body
//! directly bypasses its declared configuration entirely.

use crate::config::{BoundaryConfig, Propagation};
use crate::error::CoreResult;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::{Arc, Weak};
use txlab_store::{RecordStore, StoreTxn, TxnOptions};

/// Terminal outcome of a boundary, reported to its completion observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The boundary's writes were kept.
    Committed,
    /// The boundary's writes were discarded.
    RolledBack,
}

/// Liveness marker owned by an active boundary.
///
/// Deferred association handles hold a [`Weak`] reference to their owning
/// boundary's token; once the boundary completes, the token is dropped and
/// any later access fails with `StaleAccess`.
pub struct BoundaryToken {
    _private: (),
}

type Observer = Box<dyn FnOnce(Completion)>;
type SharedTxn = Rc<RefCell<StoreTxn>>;
type ObserverSlot = Rc<RefCell<Option<Observer>>>;

/// One entry on the thread's ambient-boundary stack.
#[derive(Clone)]
struct ActiveBoundary {
    txn: SharedTxn,
    token: Arc<BoundaryToken>,
    observer: ObserverSlot,
}

thread_local! {
    /// Ambient boundaries of this execution context. The top entry is the
    /// current boundary; nested boundaries stack.
    static AMBIENT: RefCell<Vec<ActiveBoundary>> = const { RefCell::new(Vec::new()) };
}

/// Handle given to a boundary body for data access and observer
/// registration.
pub struct BoundaryCtx {
    store: Arc<RecordStore>,
    txn: SharedTxn,
    token: Arc<BoundaryToken>,
    observer: ObserverSlot,
}

impl BoundaryCtx {
    /// Registers the completion observer for this boundary.
    ///
    /// One slot per boundary instance: registering while an observer is
    /// already in place is a no-op. Joined invocations share the owning
    /// boundary's slot. The observer fires exactly once, after the boundary
    /// has closed.
    pub fn on_completion<F>(&mut self, callback: F)
    where
        F: FnOnce(Completion) + 'static,
    {
        let mut slot = self.observer.borrow_mut();
        if slot.is_some() {
            tracing::debug!("completion observer already registered for this boundary");
            return;
        }
        *slot = Some(Box::new(callback));
    }

    /// Runs a closure against the boundary's transaction.
    pub(crate) fn with_txn<R>(&self, f: impl FnOnce(&mut StoreTxn) -> R) -> R {
        f(&mut self.txn.borrow_mut())
    }

    pub(crate) fn store(&self) -> &Arc<RecordStore> {
        &self.store
    }

    /// Weak liveness handle for deferred associations created under this
    /// boundary.
    pub(crate) fn liveness(&self) -> Weak<BoundaryToken> {
        Arc::downgrade(&self.token)
    }
}

impl fmt::Debug for BoundaryCtx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundaryCtx")
            .field("observer_registered", &self.observer.borrow().is_some())
            .finish_non_exhaustive()
    }
}

/// Opens transaction boundaries against a record store.
///
/// The runner is the boundary-aware entry point: propagation decisions
/// consult the calling thread's ambient-boundary stack, so two invocations
/// from different threads never share a boundary.
#[derive(Clone)]
pub struct BoundaryRunner {
    store: Arc<RecordStore>,
}

impl BoundaryRunner {
    /// Creates a runner over a store.
    #[must_use]
    pub fn new(store: Arc<RecordStore>) -> Self {
        Self { store }
    }

    /// Returns the underlying store.
    #[must_use]
    pub fn store(&self) -> &Arc<RecordStore> {
        &self.store
    }

    /// Runs a body under a boundary declared by `config`.
    ///
    /// On every exit path the boundary completes exactly once:
    /// - body `Ok` → commit (a failed commit, e.g. an optimistic conflict,
    ///   rolls back and surfaces the conflict instead of the body's value);
    /// - body `Err` in a category the rollback rule covers → rollback, the
    ///   error surfaces;
    /// - body `Err` in a category the rule does NOT cover → commit, and the
    ///   error STILL surfaces to the caller. The writes are kept.
    ///
    /// Propagation is decided against the thread's ambient boundary; see
    /// [`Propagation`].
    pub fn execute<T, F>(&self, config: BoundaryConfig, body: F) -> CoreResult<T>
    where
        F: FnOnce(&mut BoundaryCtx) -> CoreResult<T>,
    {
        match (config.propagation, Self::current()) {
            (Propagation::Required, Some(active)) => self.run_joined(&active, body),
            (Propagation::Nested, Some(active)) => self.run_nested(&active, config, body),
            (Propagation::RequiresNew, _) | (_, None) => self.run_fresh(config, body),
        }
    }

    /// Opens a fresh boundary with its own store transaction.
    fn run_fresh<T, F>(&self, config: BoundaryConfig, body: F) -> CoreResult<T>
    where
        F: FnOnce(&mut BoundaryCtx) -> CoreResult<T>,
    {
        let options = TxnOptions::new()
            .isolation(config.isolation)
            .read_only(config.read_only);
        let txn = self.store.begin(options);
        tracing::debug!(id = %txn.id(), ?config, "boundary opened");

        let active = ActiveBoundary {
            txn: Rc::new(RefCell::new(txn)),
            token: Arc::new(BoundaryToken { _private: () }),
            observer: Rc::new(RefCell::new(None)),
        };
        Self::push(active.clone());
        let mut ctx = self.ctx(&active);
        let result = body(&mut ctx);
        Self::pop();
        drop(ctx);

        let observer = active.observer.borrow_mut().take();
        let (completion, outcome) = self.complete(&active, config, result);
        // Boundary is closed: drop the token so deferred handles detach
        // before the observer runs.
        drop(active);
        if let Some(observer) = observer {
            observer(completion);
        }
        outcome
    }

    /// Decides and applies the terminal outcome of a fresh boundary.
    fn complete<T>(
        &self,
        active: &ActiveBoundary,
        config: BoundaryConfig,
        result: CoreResult<T>,
    ) -> (Completion, CoreResult<T>) {
        let mut txn = active.txn.borrow_mut();
        match result {
            Ok(value) => match self.store.commit(&mut txn) {
                Ok(_) => (Completion::Committed, Ok(value)),
                Err(err) => (Completion::RolledBack, Err(err.into())),
            },
            Err(err) if config.rollback_rule.forces_rollback(err.category()) => {
                // Rollback failures must not mask the body's error.
                let _ = self.store.rollback(&mut txn);
                (Completion::RolledBack, Err(err))
            }
            Err(err) => match self.store.commit(&mut txn) {
                Ok(_) => (Completion::Committed, Err(err)),
                Err(commit_err) => (Completion::RolledBack, Err(commit_err.into())),
            },
        }
    }

    /// Joins the ambient boundary. The inner configuration is intentionally
    /// not applied, and no separate completion is reported.
    fn run_joined<T, F>(&self, active: &ActiveBoundary, body: F) -> CoreResult<T>
    where
        F: FnOnce(&mut BoundaryCtx) -> CoreResult<T>,
    {
        tracing::debug!("joining ambient boundary; inner configuration not applied");
        let mut ctx = self.ctx(active);
        body(&mut ctx)
    }

    /// Runs a sub-boundary at a savepoint within the ambient transaction.
    fn run_nested<T, F>(
        &self,
        parent: &ActiveBoundary,
        config: BoundaryConfig,
        body: F,
    ) -> CoreResult<T>
    where
        F: FnOnce(&mut BoundaryCtx) -> CoreResult<T>,
    {
        let savepoint = parent.txn.borrow().savepoint();
        let child = ActiveBoundary {
            txn: Rc::clone(&parent.txn),
            token: Arc::new(BoundaryToken { _private: () }),
            observer: Rc::new(RefCell::new(None)),
        };
        tracing::debug!("nested boundary opened at savepoint");

        Self::push(child.clone());
        let mut ctx = self.ctx(&child);
        let result = body(&mut ctx);
        Self::pop();
        drop(ctx);

        let observer = child.observer.borrow_mut().take();
        let (completion, outcome) = match result {
            // Writes stay in the parent transaction; they become durable
            // only if the parent commits.
            Ok(value) => (Completion::Committed, Ok(value)),
            Err(err) if config.rollback_rule.forces_rollback(err.category()) => {
                let rolled = child.txn.borrow_mut().rollback_to(savepoint);
                match rolled {
                    Ok(()) => (Completion::RolledBack, Err(err)),
                    Err(sp_err) => (Completion::RolledBack, Err(sp_err.into())),
                }
            }
            Err(err) => (Completion::Committed, Err(err)),
        };
        drop(child);
        if let Some(observer) = observer {
            observer(completion);
        }
        outcome
    }

    fn ctx(&self, active: &ActiveBoundary) -> BoundaryCtx {
        BoundaryCtx {
            store: Arc::clone(&self.store),
            txn: Rc::clone(&active.txn),
            token: Arc::clone(&active.token),
            observer: Rc::clone(&active.observer),
        }
    }

    fn current() -> Option<ActiveBoundary> {
        AMBIENT.with(|stack| stack.borrow().last().cloned())
    }

    fn push(active: ActiveBoundary) {
        AMBIENT.with(|stack| stack.borrow_mut().push(active));
    }

    fn pop() {
        AMBIENT.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

impl fmt::Debug for BoundaryRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundaryRunner")
            .field("store", &self.store)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RollbackRule;
    use crate::error::CoreError;
    use bytes::Bytes;
    use std::cell::Cell;
    use txlab_store::{IsolationLevel, RowKey, TableId, WriteGuard};

    const TABLE: TableId = TableId::new(7);

    fn key(b: u8) -> RowKey {
        RowKey::from_bytes([b; 16])
    }

    fn runner() -> BoundaryRunner {
        BoundaryRunner::new(Arc::new(RecordStore::new()))
    }

    fn write(ctx: &mut BoundaryCtx, k: RowKey, value: &'static [u8]) -> CoreResult<()> {
        ctx.with_txn(|txn| txn.stage_put(TABLE, k, Bytes::from_static(value), WriteGuard::Unchecked))
            .map_err(Into::into)
    }

    fn latest(runner: &BoundaryRunner, k: RowKey) -> Option<Bytes> {
        runner.store().read_latest(TABLE, k).map(|row| row.payload)
    }

    #[test]
    fn commit_on_ok() {
        let runner = runner();
        let value = runner
            .execute(BoundaryConfig::default(), |ctx| {
                write(ctx, key(1), b"persisted")?;
                Ok(42)
            })
            .unwrap();
        assert_eq!(value, 42);
        assert_eq!(latest(&runner, key(1)), Some(Bytes::from_static(b"persisted")));
    }

    #[test]
    fn fatal_failure_rolls_back() {
        let runner = runner();
        let result: CoreResult<()> = runner.execute(BoundaryConfig::default(), |ctx| {
            write(ctx, key(1), b"doomed")?;
            Err(CoreError::fatal("broken"))
        });
        assert!(matches!(result, Err(CoreError::Fatal { .. })));
        assert!(latest(&runner, key(1)).is_none());
    }

    #[test]
    fn recoverable_failure_commits_by_default() {
        let runner = runner();
        let result: CoreResult<()> = runner.execute(BoundaryConfig::default(), |ctx| {
            write(ctx, key(1), b"kept")?;
            Err(CoreError::recoverable("survivable"))
        });
        // The error surfaces, but the write committed.
        assert!(matches!(result, Err(CoreError::Recoverable { .. })));
        assert_eq!(latest(&runner, key(1)), Some(Bytes::from_static(b"kept")));
    }

    #[test]
    fn forced_rule_rolls_back_recoverable_failure() {
        let runner = runner();
        let config = BoundaryConfig::new().rollback_rule(RollbackRule::AllFailures);
        let result: CoreResult<()> = runner.execute(config, |ctx| {
            write(ctx, key(1), b"doomed")?;
            Err(CoreError::recoverable("still rolled back"))
        });
        assert!(matches!(result, Err(CoreError::Recoverable { .. })));
        assert!(latest(&runner, key(1)).is_none());
    }

    #[test]
    fn read_only_boundary_rejects_writes() {
        let runner = runner();
        let config = BoundaryConfig::new().read_only(true);
        let result: CoreResult<()> = runner.execute(config, |ctx| write(ctx, key(1), b"nope"));
        assert!(matches!(result, Err(CoreError::ReadOnlyViolation)));
        assert!(latest(&runner, key(1)).is_none());
    }

    #[test]
    fn joined_invocation_ignores_inner_config() {
        let runner = runner();
        let inner = runner.clone();
        runner
            .execute(BoundaryConfig::default(), |_outer| {
                // Joined with read_only=true, yet the write goes through:
                // the inner configuration is not applied.
                inner.execute(BoundaryConfig::new().read_only(true), |ctx| {
                    write(ctx, key(1), b"written-anyway")
                })
            })
            .unwrap();
        assert_eq!(
            latest(&runner, key(1)),
            Some(Bytes::from_static(b"written-anyway"))
        );
    }

    #[test]
    fn joined_failure_propagates_to_owner() {
        let runner = runner();
        let inner = runner.clone();
        let result: CoreResult<()> = runner.execute(BoundaryConfig::default(), |ctx| {
            write(ctx, key(1), b"outer")?;
            inner.execute(BoundaryConfig::default(), |_| {
                Err::<(), _>(CoreError::fatal("from the joined body"))
            })
        });
        assert!(result.is_err());
        // The owner's boundary rolled back; the outer write is gone.
        assert!(latest(&runner, key(1)).is_none());
    }

    #[test]
    fn requires_new_commits_independently_of_outer_rollback() {
        let runner = runner();
        let inner = runner.clone();
        let result: CoreResult<()> = runner.execute(BoundaryConfig::default(), |ctx| {
            write(ctx, key(1), b"outer-doomed")?;
            inner
                .execute(
                    BoundaryConfig::new().propagation(Propagation::RequiresNew),
                    |ctx| write(ctx, key(2), b"inner-survives"),
                )?;
            Err(CoreError::fatal("outer fails after inner committed"))
        });
        assert!(result.is_err());
        assert!(latest(&runner, key(1)).is_none());
        assert_eq!(
            latest(&runner, key(2)),
            Some(Bytes::from_static(b"inner-survives"))
        );
    }

    #[test]
    fn nested_child_rollback_keeps_parent() {
        let runner = runner();
        let inner = runner.clone();
        runner
            .execute(BoundaryConfig::default(), |ctx| {
                write(ctx, key(1), b"parent")?;
                let child: CoreResult<()> = inner.execute(
                    BoundaryConfig::new().propagation(Propagation::Nested),
                    |ctx| {
                        write(ctx, key(2), b"child-doomed")?;
                        Err(CoreError::fatal("child fails"))
                    },
                );
                assert!(child.is_err());
                Ok(())
            })
            .unwrap();
        assert_eq!(latest(&runner, key(1)), Some(Bytes::from_static(b"parent")));
        assert!(latest(&runner, key(2)).is_none());
    }

    #[test]
    fn parent_rollback_discards_committed_child() {
        let runner = runner();
        let inner = runner.clone();
        let result: CoreResult<()> = runner.execute(BoundaryConfig::default(), |_ctx| {
            inner.execute(
                BoundaryConfig::new().propagation(Propagation::Nested),
                |ctx| write(ctx, key(1), b"child-committed"),
            )?;
            Err(CoreError::fatal("parent fails after child commit"))
        });
        assert!(result.is_err());
        // Nested boundaries are sub-transactions: the child's write dies
        // with the parent.
        assert!(latest(&runner, key(1)).is_none());
    }

    #[test]
    fn nested_without_ambient_acts_as_required() {
        let runner = runner();
        runner
            .execute(
                BoundaryConfig::new().propagation(Propagation::Nested),
                |ctx| write(ctx, key(1), b"top-level"),
            )
            .unwrap();
        assert_eq!(latest(&runner, key(1)), Some(Bytes::from_static(b"top-level")));
    }

    #[test]
    fn observer_fires_once_on_commit() {
        let runner = runner();
        let fired = Rc::new(Cell::new(0u32));
        let seen = Rc::new(Cell::new(None));
        let fired2 = Rc::clone(&fired);
        let seen2 = Rc::clone(&seen);
        runner
            .execute(BoundaryConfig::default(), |ctx| {
                ctx.on_completion(move |completion| {
                    fired2.set(fired2.get() + 1);
                    seen2.set(Some(completion));
                });
                write(ctx, key(1), b"x")
            })
            .unwrap();
        assert_eq!(fired.get(), 1);
        assert_eq!(seen.get(), Some(Completion::Committed));
    }

    #[test]
    fn observer_reports_rollback() {
        let runner = runner();
        let seen = Rc::new(Cell::new(None));
        let seen2 = Rc::clone(&seen);
        let _result: CoreResult<()> = runner.execute(BoundaryConfig::default(), |ctx| {
            ctx.on_completion(move |completion| seen2.set(Some(completion)));
            Err(CoreError::fatal("x"))
        });
        assert_eq!(seen.get(), Some(Completion::RolledBack));
    }

    #[test]
    fn observer_registration_is_idempotent() {
        let runner = runner();
        let first = Rc::new(Cell::new(false));
        let second = Rc::new(Cell::new(false));
        let first2 = Rc::clone(&first);
        let second2 = Rc::clone(&second);
        runner
            .execute(BoundaryConfig::default(), |ctx| {
                ctx.on_completion(move |_| first2.set(true));
                ctx.on_completion(move |_| second2.set(true));
                Ok(())
            })
            .unwrap();
        assert!(first.get());
        assert!(!second.get());
    }

    #[test]
    fn joined_invocation_shares_observer_slot() {
        let runner = runner();
        let inner = runner.clone();
        let owner = Rc::new(Cell::new(false));
        let joined = Rc::new(Cell::new(false));
        let owner2 = Rc::clone(&owner);
        let joined2 = Rc::clone(&joined);
        runner
            .execute(BoundaryConfig::default(), |ctx| {
                ctx.on_completion(move |_| owner2.set(true));
                inner.execute(BoundaryConfig::default(), |ctx| {
                    // Same boundary, same slot: this registration is a no-op.
                    ctx.on_completion(move |_| joined2.set(true));
                    Ok(())
                })
            })
            .unwrap();
        assert!(owner.get());
        assert!(!joined.get());
    }

    #[test]
    fn nested_child_has_its_own_observer_slot() {
        let runner = runner();
        let inner = runner.clone();
        let parent_seen = Rc::new(Cell::new(None));
        let child_seen = Rc::new(Cell::new(None));
        let parent2 = Rc::clone(&parent_seen);
        let child2 = Rc::clone(&child_seen);
        runner
            .execute(BoundaryConfig::default(), |ctx| {
                ctx.on_completion(move |c| parent2.set(Some(c)));
                let child: CoreResult<()> = inner.execute(
                    BoundaryConfig::new().propagation(Propagation::Nested),
                    |ctx| {
                        ctx.on_completion(move |c| child2.set(Some(c)));
                        Err(CoreError::fatal("child fails"))
                    },
                );
                assert!(child.is_err());
                Ok(())
            })
            .unwrap();
        assert_eq!(child_seen.get(), Some(Completion::RolledBack));
        assert_eq!(parent_seen.get(), Some(Completion::Committed));
    }

    #[test]
    fn commit_conflict_rolls_back_and_surfaces() {
        let runner = runner();
        // Seed a row at version 1.
        runner
            .execute(BoundaryConfig::default(), |ctx| write(ctx, key(1), b"v1"))
            .unwrap();

        let store = Arc::clone(runner.store());
        let result: CoreResult<()> = runner.execute(BoundaryConfig::default(), |ctx| {
            let read = ctx
                .with_txn(|txn| store.read(txn, TABLE, key(1)))
                .map_err(CoreError::from)?
                .expect("seeded row");
            // Another committer advances the version before we commit.
            runner
                .execute(
                    BoundaryConfig::new().propagation(Propagation::RequiresNew),
                    |ctx| write(ctx, key(1), b"v2"),
                )?;
            ctx.with_txn(|txn| {
                txn.stage_put(
                    TABLE,
                    key(1),
                    Bytes::from_static(b"stale"),
                    WriteGuard::Expect(read.version),
                )
            })
            .map_err(CoreError::from)?;
            Ok(())
        });
        assert!(matches!(result, Err(CoreError::OptimisticConflict { .. })));
        assert_eq!(latest(&runner, key(1)), Some(Bytes::from_static(b"v2")));
    }

    #[test]
    fn isolation_config_applies_to_fresh_boundary() {
        let runner = runner();
        runner
            .execute(BoundaryConfig::default(), |ctx| write(ctx, key(1), b"old"))
            .unwrap();

        let store = Arc::clone(runner.store());
        let config = BoundaryConfig::new().isolation(IsolationLevel::Serializable);
        runner
            .execute(config, |ctx| {
                // Commit a newer revision from an independent boundary.
                runner.execute(
                    BoundaryConfig::new().propagation(Propagation::RequiresNew),
                    |ctx| write(ctx, key(1), b"new"),
                )?;
                let row = ctx
                    .with_txn(|txn| store.read(txn, TABLE, key(1)))
                    .map_err(CoreError::from)?
                    .expect("row");
                // Snapshot-pinned: still the old value.
                assert_eq!(row.payload, Bytes::from_static(b"old"));
                Ok(())
            })
            .unwrap();
    }
}
