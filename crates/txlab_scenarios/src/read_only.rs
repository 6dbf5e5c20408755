//! Writes under a read-only boundary.

use crate::harness::Harness;
use crate::report::ScenarioReport;
use txlab_core::{BoundaryConfig, CoreError};

/// Attempts a write inside a boundary declared read-only.
///
/// The store rejects the staged write with `ReadOnlyViolation`; the
/// boundary rolls back and the committed value is untouched.
pub fn read_only_mutation(harness: &Harness) -> ScenarioReport {
    let mut report = ScenarioReport::new("read-only-mutation");
    let person = harness.seed_alice();

    let result = harness
        .runner
        .execute(BoundaryConfig::new().read_only(true), |ctx| {
            let mut fetched = harness.repo.find_by_id(ctx, person.id)?;
            fetched.person.name = "mutated-under-read-only".into();
            harness.repo.save(ctx, &fetched.person)
        });

    match result {
        Err(CoreError::ReadOnlyViolation) => {
            report.note("write under a read-only boundary failed with ReadOnlyViolation");
        }
        Ok(()) => report.fail("write under a read-only boundary should not succeed"),
        Err(err) => report.fail(format!("expected ReadOnlyViolation, got: {err}")),
    }

    let name = harness.committed_name(person.id).unwrap_or_default();
    report.check(name == "Alice", "committed value must be unchanged");
    report.note(format!("committed name is still {name:?}"));
    report
}
