//! Nested and requires-new propagation.

use crate::harness::Harness;
use crate::report::ScenarioReport;
use txlab_core::{BoundaryConfig, BoundaryCtx, CoreError, CoreResult, Propagation, RecordId};

fn rename(harness: &Harness, ctx: &mut BoundaryCtx, id: RecordId, name: &str) -> CoreResult<()> {
    let mut fetched = harness.repo.find_by_id(ctx, id)?;
    fetched.person.name = name.into();
    harness.repo.save(ctx, &fetched.person)
}

/// Nested boundaries are sub-transactions of their parent.
///
/// Two phases: a child rollback leaves the parent's work intact, and a
/// parent rollback discards even a "committed" child, since the child's writes
/// were only ever part of the parent transaction.
pub fn nested_propagation(harness: &Harness) -> ScenarioReport {
    let mut report = ScenarioReport::new("nested-propagation");
    let person = harness.seed_alice();
    let inner = harness.runner.clone();

    // Phase 1: child fails and rolls back to its savepoint; the parent's
    // own write commits.
    let phase1 = harness.runner.execute(BoundaryConfig::default(), |ctx| {
        rename(harness, ctx, person.id, "parent-update")?;
        let child: CoreResult<()> = inner.execute(
            BoundaryConfig::new().propagation(Propagation::Nested),
            |ctx| {
                rename(harness, ctx, person.id, "child-doomed")?;
                Err(CoreError::fatal("child aborts"))
            },
        );
        if child.is_ok() {
            return Err(CoreError::fatal("child was expected to fail"));
        }
        Ok(())
    });
    report.check(phase1.is_ok(), "parent should commit after child rollback");
    let name = harness.committed_name(person.id).unwrap_or_default();
    report.check(
        name == "parent-update",
        "child rollback must not unwind the parent",
    );
    report.note(format!(
        "child rolled back to its savepoint; parent committed {name:?}"
    ));

    // Phase 2: child "commits", then the parent rolls back; the child's
    // write is discarded with it.
    let phase2: CoreResult<()> = harness.runner.execute(BoundaryConfig::default(), |_ctx| {
        inner.execute(
            BoundaryConfig::new().propagation(Propagation::Nested),
            |ctx| rename(harness, ctx, person.id, "child-kept"),
        )?;
        Err(CoreError::fatal("parent fails after child commit"))
    });
    report.check(phase2.is_err(), "parent should fail");
    let name = harness.committed_name(person.id).unwrap_or_default();
    report.check(
        name == "parent-update",
        "parent rollback must discard the child's write",
    );
    report.note(format!(
        "parent rolled back after the child committed; name is back to {name:?}"
    ));
    report
}

/// A requires-new boundary commits independently of its suspended parent.
///
/// The child's rename is durable the moment its own boundary commits; the
/// parent's later rollback cannot take it back.
pub fn requires_new_propagation(harness: &Harness) -> ScenarioReport {
    let mut report = ScenarioReport::new("requires-new-propagation");
    let person = harness.seed_alice();
    let inner = harness.runner.clone();

    let result: CoreResult<()> = harness.runner.execute(BoundaryConfig::default(), |ctx| {
        rename(harness, ctx, person.id, "parent-doomed")?;
        inner.execute(
            BoundaryConfig::new().propagation(Propagation::RequiresNew),
            |ctx| rename(harness, ctx, person.id, "independent-update"),
        )?;
        Err(CoreError::fatal("parent fails after the child committed"))
    });
    report.check(result.is_err(), "parent should fail");

    let name = harness.committed_name(person.id).unwrap_or_default();
    report.check(
        name == "independent-update",
        "the child's commit must survive the parent's rollback",
    );
    report.note("child suspended the ambient boundary and committed on its own");
    report.note(format!(
        "parent rolled back, child's write survived; name is {name:?}"
    ));
    report
}
