//! Per-scenario harness.

use std::sync::Arc;
use txlab_core::{
    BoundaryConfig, BoundaryRunner, ContactCard, Person, RecordCodec, RecordId, RecordRepository,
    RecordStore, Version, PERSON_TABLE,
};

/// Everything a scenario runs against: one store with its boundary-aware
/// entry point and repository.
///
/// Each scenario gets a fresh harness, so no scenario observes another's
/// writes.
pub struct Harness {
    /// The shared record store.
    pub store: Arc<RecordStore>,
    /// The only way to open a boundary.
    pub runner: BoundaryRunner,
    /// Typed data access.
    pub repo: RecordRepository,
}

impl Harness {
    /// Creates a harness over an empty store.
    #[must_use]
    pub fn new() -> Self {
        let store = Arc::new(RecordStore::new());
        Self {
            runner: BoundaryRunner::new(Arc::clone(&store)),
            repo: RecordRepository::new(Arc::clone(&store)),
            store,
        }
    }

    /// Seeds the standard demo person in their own committed boundary:
    /// "Alice", age 30, with a contact card.
    pub fn seed_alice(&self) -> Person {
        let repo = self.repo.clone();
        self.runner
            .execute(BoundaryConfig::default(), move |ctx| {
                repo.insert(
                    ctx,
                    "Alice",
                    30,
                    ContactCard {
                        email: "alice@example.com".into(),
                        city: "Dodoma".into(),
                    },
                )
            })
            .expect("seeding should commit")
    }

    /// Latest committed person record, read outside any boundary.
    #[must_use]
    pub fn committed_person(&self, id: RecordId) -> Option<(Person, Version)> {
        let row = self.store.read_latest(PERSON_TABLE, id.row_key())?;
        let person = Person::decode(&row.payload).ok()?;
        Some((person, row.version))
    }

    /// Latest committed name of a person.
    #[must_use]
    pub fn committed_name(&self, id: RecordId) -> Option<String> {
        self.committed_person(id).map(|(p, _)| p.name)
    }

    /// Latest committed age of a person.
    #[must_use]
    pub fn committed_age(&self, id: RecordId) -> Option<u32> {
        self.committed_person(id).map(|(p, _)| p.age)
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Harness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Harness")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}
