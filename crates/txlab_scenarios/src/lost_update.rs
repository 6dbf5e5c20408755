//! Concurrent read-modify-write: the lost update and its two protections.

use crate::harness::Harness;
use crate::report::ScenarioReport;
use std::sync::{Arc, Barrier};
use std::thread;
use txlab_core::{BoundaryConfig, CoreError, CoreResult, RecordId};

/// Outcome of one racing writer.
type WriterResult = CoreResult<()>;

/// Runs two writers against the same person, both renaming it to their own
/// target. `protected` selects the optimistic version guard.
///
/// The barrier sits between the read and the write, inside each boundary,
/// so both writers hold a stale read when they update: the interleaving
/// that loses an update.
fn race_renames(
    harness: &Harness,
    id: RecordId,
    targets: [&'static str; 2],
    protected: bool,
) -> Vec<WriterResult> {
    let barrier = Arc::new(Barrier::new(2));
    let mut handles = Vec::new();
    for target in targets {
        let runner = harness.runner.clone();
        let repo = harness.repo.clone();
        let barrier = Arc::clone(&barrier);
        handles.push(thread::spawn(move || -> WriterResult {
            runner.execute(BoundaryConfig::default(), |ctx| {
                let mut fetched = repo.find_by_id(ctx, id)?;
                let observed = fetched.version;
                barrier.wait();
                fetched.person.name = target.into();
                if protected {
                    repo.save_if_unchanged(ctx, &fetched.person, observed)
                } else {
                    repo.save(ctx, &fetched.person)
                }
            })
        }));
    }
    handles
        .into_iter()
        .map(|handle| handle.join().expect("writer thread panicked"))
        .collect()
}

/// Unprotected read-modify-write from two tasks.
///
/// Both writers commit without error, but one update silently vanishes:
/// the classic lost update. Nothing is thrown; that is the pitfall.
pub fn concurrent_update(harness: &Harness) -> ScenarioReport {
    let mut report = ScenarioReport::new("concurrent-update");
    let person = harness.seed_alice();

    let results = race_renames(harness, person.id, ["writer-a", "writer-b"], false);
    let failures = results.iter().filter(|r| r.is_err()).count();
    report.check(failures == 0, "unprotected writers should both succeed");
    report.note("both writers committed without any error");

    let final_name = harness.committed_name(person.id).unwrap_or_default();
    report.check(
        final_name == "writer-a" || final_name == "writer-b",
        "final value should come from one of the writers",
    );
    report.note(format!(
        "final name is {final_name:?}; the other writer's update was silently lost"
    ));
    report
}

/// The same race with an optimistic version guard on each write.
///
/// The store validates the guard at commit: exactly one writer wins, the
/// other observes `OptimisticConflict` and its boundary rolls back.
pub fn concurrent_update_protected_optimistic(harness: &Harness) -> ScenarioReport {
    let mut report = ScenarioReport::new("concurrent-update-protected-optimistic");
    let person = harness.seed_alice();

    let results = race_renames(harness, person.id, ["writer-a", "writer-b"], true);
    let successes = results.iter().filter(|r| r.is_ok()).count();
    let conflicts = results
        .iter()
        .filter(|r| matches!(r, Err(CoreError::OptimisticConflict { .. })))
        .count();
    report.check(successes == 1, "exactly one writer should commit");
    report.check(
        conflicts == 1,
        "the other writer should observe OptimisticConflict",
    );
    report.note(format!(
        "{successes} writer committed, {conflicts} observed an optimistic conflict"
    ));

    let (committed, version) = harness
        .committed_person(person.id)
        .expect("seeded person exists");
    report.check(
        committed.name == "writer-a" || committed.name == "writer-b",
        "the winner's value should be committed",
    );
    report.note(format!(
        "final name is {:?} at {version}; no update was silently lost",
        committed.name
    ));
    report
}

/// The same intent protected by a pessimistic row lock instead.
///
/// Each writer takes the lock before reading the value it modifies, so the
/// writers fully serialize: both increments survive and no conflict is ever
/// observed.
pub fn concurrent_update_protected_pessimistic(harness: &Harness) -> ScenarioReport {
    let mut report = ScenarioReport::new("concurrent-update-protected-pessimistic");
    let person = harness.seed_alice();

    let barrier = Arc::new(Barrier::new(2));
    let mut handles = Vec::new();
    for target in ["writer-a", "writer-b"] {
        let runner = harness.runner.clone();
        let repo = harness.repo.clone();
        let barrier = Arc::clone(&barrier);
        let id = person.id;
        handles.push(thread::spawn(move || -> WriterResult {
            barrier.wait();
            runner.execute(BoundaryConfig::default(), |ctx| {
                // Lock first, then read: the read-modify-write is atomic
                // with respect to the other locker.
                repo.lock(ctx, id)?;
                let mut fetched = repo.find_by_id(ctx, id)?;
                fetched.person.age += 1;
                fetched.person.name = target.into();
                repo.save(ctx, &fetched.person)
            })
        }));
    }
    let results: Vec<WriterResult> = handles
        .into_iter()
        .map(|handle| handle.join().expect("writer thread panicked"))
        .collect();

    let failures = results.iter().filter(|r| r.is_err()).count();
    report.check(failures == 0, "locked writers should both succeed");

    let age = harness.committed_age(person.id).unwrap_or_default();
    report.check(age == 32, "both increments should survive");
    report.note(format!(
        "writers serialized on the row lock; age went 30 -> {age}, nothing lost"
    ));
    report
}
