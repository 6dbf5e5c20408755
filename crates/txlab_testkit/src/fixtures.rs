//! Store and boundary fixtures.
//!
//! Provides convenience constructors for a fresh store with its runner and
//! repository, optionally pre-seeded with the standard demo person.

use std::sync::Arc;
use txlab_core::{
    BoundaryConfig, BoundaryRunner, ContactCard, Person, RecordRepository, RecordStore,
};

/// A fresh store with a boundary runner and repository over it.
pub struct TestStore {
    /// The shared store.
    pub store: Arc<RecordStore>,
    /// Boundary-aware entry point.
    pub runner: BoundaryRunner,
    /// Typed data access.
    pub repo: RecordRepository,
}

impl TestStore {
    /// Creates an empty store with its runner and repository.
    #[must_use]
    pub fn new() -> Self {
        let store = Arc::new(RecordStore::new());
        Self {
            runner: BoundaryRunner::new(Arc::clone(&store)),
            repo: RecordRepository::new(Arc::clone(&store)),
            store,
        }
    }

    /// Inserts a person in their own committed boundary.
    pub fn seed_person(&self, name: &str, age: u32) -> Person {
        let repo = self.repo.clone();
        let name = name.to_string();
        self.runner
            .execute(BoundaryConfig::default(), move |ctx| {
                repo.insert(ctx, name, age, standard_card())
            })
            .expect("seeding should commit")
    }
}

impl Default for TestStore {
    fn default() -> Self {
        Self::new()
    }
}

/// A test store pre-seeded with one person.
pub struct SeededStore {
    /// The underlying test store.
    pub fx: TestStore,
    /// The committed person.
    pub person: Person,
}

impl SeededStore {
    /// Seeds the standard demo person: "Alice", age 30, with a contact card.
    #[must_use]
    pub fn alice() -> Self {
        let fx = TestStore::new();
        let person = fx.seed_person("Alice", 30);
        Self { fx, person }
    }
}

/// The contact card every seeded person carries.
#[must_use]
pub fn standard_card() -> ContactCard {
    ContactCard {
        email: "alice@example.com".into(),
        city: "Dodoma".into(),
    }
}
