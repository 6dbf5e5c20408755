//! Typed data access for the demo entities.

use crate::boundary::BoundaryCtx;
use crate::codec::RecordCodec;
use crate::error::{CoreError, CoreResult};
use crate::lazy::{Deferred, Lazy};
use crate::model::{ContactCard, FetchedPerson, Person};
use crate::record::RecordId;
use std::sync::Arc;
use txlab_store::{RecordStore, TableId, Version, WriteGuard};

/// Table holding person records.
pub const PERSON_TABLE: TableId = TableId::new(1);
/// Table holding contact cards, keyed by the owning person's ID.
pub const CONTACT_TABLE: TableId = TableId::new(2);

/// Find/save access to persons and their contact cards.
///
/// Every operation acts under the boundary whose [`BoundaryCtx`] it is
/// given; nothing here opens or closes boundaries.
#[derive(Clone)]
pub struct RecordRepository {
    store: Arc<RecordStore>,
}

impl RecordRepository {
    /// Creates a repository over a store.
    #[must_use]
    pub fn new(store: Arc<RecordStore>) -> Self {
        Self { store }
    }

    /// Inserts a new person with their contact card.
    ///
    /// The identifier is assigned here; the rows become visible when the
    /// boundary commits.
    pub fn insert(
        &self,
        ctx: &mut BoundaryCtx,
        name: impl Into<String>,
        age: u32,
        card: ContactCard,
    ) -> CoreResult<Person> {
        let person = Person::new(name, age);
        let key = person.id.row_key();
        let person_payload = person.encode()?;
        let card_payload = card.encode()?;
        ctx.with_txn(|txn| {
            txn.stage_put(PERSON_TABLE, key, person_payload, WriteGuard::Unchecked)?;
            txn.stage_put(CONTACT_TABLE, key, card_payload, WriteGuard::Unchecked)
        })?;
        Ok(person)
    }

    /// Finds a person, leaving the contact card deferred.
    ///
    /// The returned association is tied to the current boundary: it loads
    /// on demand while the boundary is open and fails with `StaleAccess`
    /// afterwards.
    pub fn find_by_id(&self, ctx: &mut BoundaryCtx, id: RecordId) -> CoreResult<FetchedPerson> {
        let key = id.row_key();
        let row = ctx
            .with_txn(|txn| self.store.read(txn, PERSON_TABLE, key))?
            .ok_or_else(|| CoreError::not_found(PERSON_TABLE, key))?;
        let person = Person::decode(&row.payload)?;
        let contact = Lazy::Deferred(Deferred::new(
            Arc::clone(&self.store),
            CONTACT_TABLE,
            key,
            ctx.liveness(),
        ));
        Ok(FetchedPerson {
            person,
            version: row.version,
            contact,
        })
    }

    /// Finds a person and their contact card in one boundary.
    pub fn find_by_id_eager(
        &self,
        ctx: &mut BoundaryCtx,
        id: RecordId,
    ) -> CoreResult<FetchedPerson> {
        let key = id.row_key();
        let row = ctx
            .with_txn(|txn| self.store.read(txn, PERSON_TABLE, key))?
            .ok_or_else(|| CoreError::not_found(PERSON_TABLE, key))?;
        let person = Person::decode(&row.payload)?;
        let card_row = ctx
            .with_txn(|txn| self.store.read(txn, CONTACT_TABLE, key))?
            .ok_or_else(|| CoreError::not_found(CONTACT_TABLE, key))?;
        let card = ContactCard::decode(&card_row.payload)?;
        Ok(FetchedPerson {
            person,
            version: row.version,
            contact: Lazy::Loaded(card),
        })
    }

    /// Saves a person without conflict protection.
    ///
    /// Last committer wins: a concurrent update to the same person is
    /// silently overwritten.
    pub fn save(&self, ctx: &mut BoundaryCtx, person: &Person) -> CoreResult<()> {
        let payload = person.encode()?;
        ctx.with_txn(|txn| {
            txn.stage_put(
                PERSON_TABLE,
                person.id.row_key(),
                payload,
                WriteGuard::Unchecked,
            )
        })?;
        Ok(())
    }

    /// Saves a person only if their version is still `expected` at commit.
    ///
    /// A concurrent committed update surfaces as
    /// [`CoreError::OptimisticConflict`] when this boundary commits.
    pub fn save_if_unchanged(
        &self,
        ctx: &mut BoundaryCtx,
        person: &Person,
        expected: Version,
    ) -> CoreResult<()> {
        let payload = person.encode()?;
        ctx.with_txn(|txn| {
            txn.stage_put(
                PERSON_TABLE,
                person.id.row_key(),
                payload,
                WriteGuard::Expect(expected),
            )
        })?;
        Ok(())
    }

    /// Acquires the pessimistic row lock for a person.
    ///
    /// Blocks until the lock is free; held until the boundary's transaction
    /// completes. Acquire before reading the value you intend to modify.
    pub fn lock(&self, ctx: &mut BoundaryCtx, id: RecordId) -> CoreResult<()> {
        ctx.with_txn(|txn| self.store.lock_row(txn, PERSON_TABLE, id.row_key()))?;
        Ok(())
    }
}

impl std::fmt::Debug for RecordRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordRepository").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::BoundaryRunner;
    use crate::config::BoundaryConfig;

    fn setup() -> (BoundaryRunner, RecordRepository) {
        let store = Arc::new(RecordStore::new());
        let runner = BoundaryRunner::new(Arc::clone(&store));
        let repo = RecordRepository::new(store);
        (runner, repo)
    }

    fn card() -> ContactCard {
        ContactCard {
            email: "alice@example.com".into(),
            city: "Dodoma".into(),
        }
    }

    fn seed(runner: &BoundaryRunner, repo: &RecordRepository) -> Person {
        runner
            .execute(BoundaryConfig::default(), |ctx| {
                repo.insert(ctx, "Alice", 30, card())
            })
            .unwrap()
    }

    #[test]
    fn insert_then_find() {
        let (runner, repo) = setup();
        let person = seed(&runner, &repo);

        let fetched = runner
            .execute(BoundaryConfig::default(), |ctx| {
                repo.find_by_id(ctx, person.id)
            })
            .unwrap();
        assert_eq!(fetched.person, person);
        assert_eq!(fetched.version, Version::new(1));
    }

    #[test]
    fn find_missing_is_not_found() {
        let (runner, repo) = setup();
        let result = runner.execute(BoundaryConfig::default(), |ctx| {
            repo.find_by_id(ctx, RecordId::new())
        });
        assert!(matches!(result, Err(CoreError::NotFound { .. })));
    }

    #[test]
    fn eager_fetch_loads_contact() {
        let (runner, repo) = setup();
        let person = seed(&runner, &repo);

        let fetched = runner
            .execute(BoundaryConfig::default(), |ctx| {
                repo.find_by_id_eager(ctx, person.id)
            })
            .unwrap();
        assert!(fetched.contact.is_loaded());
        // Loaded associations stay accessible after the boundary closes.
        assert_eq!(fetched.contact.get().unwrap(), card());
    }

    #[test]
    fn lazy_contact_loads_inside_boundary() {
        let (runner, repo) = setup();
        let person = seed(&runner, &repo);

        runner
            .execute(BoundaryConfig::default(), |ctx| {
                let fetched = repo.find_by_id(ctx, person.id)?;
                assert!(!fetched.contact.is_loaded());
                assert_eq!(fetched.contact.get()?, card());
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn lazy_contact_is_stale_after_boundary_closes() {
        let (runner, repo) = setup();
        let person = seed(&runner, &repo);

        let fetched = runner
            .execute(BoundaryConfig::default(), |ctx| {
                repo.find_by_id(ctx, person.id)
            })
            .unwrap();
        let result = fetched.contact.get();
        assert!(matches!(result, Err(CoreError::StaleAccess)));
    }

    #[test]
    fn save_bumps_version_on_commit() {
        let (runner, repo) = setup();
        let mut person = seed(&runner, &repo);

        person.name = "Alicia".into();
        runner
            .execute(BoundaryConfig::default(), |ctx| repo.save(ctx, &person))
            .unwrap();

        let fetched = runner
            .execute(BoundaryConfig::default(), |ctx| {
                repo.find_by_id(ctx, person.id)
            })
            .unwrap();
        assert_eq!(fetched.person.name, "Alicia");
        assert_eq!(fetched.version, Version::new(2));
    }

    #[test]
    fn guarded_save_conflicts_when_version_moved() {
        let (runner, repo) = setup();
        let person = seed(&runner, &repo);

        // Advance the version behind the guarded writer's back.
        let mut renamed = person.clone();
        renamed.name = "Sneaky".into();
        runner
            .execute(BoundaryConfig::default(), |ctx| repo.save(ctx, &renamed))
            .unwrap();

        let mut stale = person.clone();
        stale.name = "Stale".into();
        let result = runner.execute(BoundaryConfig::default(), |ctx| {
            repo.save_if_unchanged(ctx, &stale, Version::new(1))
        });
        assert!(matches!(result, Err(CoreError::OptimisticConflict { .. })));

        let fetched = runner
            .execute(BoundaryConfig::default(), |ctx| {
                repo.find_by_id(ctx, person.id)
            })
            .unwrap();
        assert_eq!(fetched.person.name, "Sneaky");
    }

    #[test]
    fn read_only_boundary_blocks_save() {
        let (runner, repo) = setup();
        let person = seed(&runner, &repo);

        let result = runner.execute(BoundaryConfig::new().read_only(true), |ctx| {
            let mut fetched = repo.find_by_id(ctx, person.id)?;
            fetched.person.name = "Mutated".into();
            repo.save(ctx, &fetched.person)
        });
        assert!(matches!(result, Err(CoreError::ReadOnlyViolation)));
    }
}
