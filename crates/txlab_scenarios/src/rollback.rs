//! Failure-category rollback rules.
//!
//! The boundary commits or rolls back based on the failure's category and
//! the declared rule, not on whether the body failed. A recoverable
//! failure under the default rule surfaces to the caller with the writes
//! committed, which is exactly the behavior that surprises people.

use crate::harness::Harness;
use crate::report::ScenarioReport;
use std::sync::{Arc, Mutex};
use txlab_core::{BoundaryConfig, Completion, CoreError, RollbackRule};

/// Recoverable failure under the default rule: the write commits anyway.
pub fn recoverable_failure_default(harness: &Harness) -> ScenarioReport {
    let mut report = ScenarioReport::new("recoverable-failure-default");
    let person = harness.seed_alice();
    let id = person.id;

    let completion = Arc::new(Mutex::new(None));
    let completion_slot = Arc::clone(&completion);
    let result = harness
        .runner
        .execute(BoundaryConfig::default(), move |ctx| {
            ctx.on_completion(move |outcome| {
                *completion_slot.lock().expect("completion slot") = Some(outcome);
            });
            let mut fetched = harness.repo.find_by_id(ctx, id)?;
            fetched.person.name = "written-before-failure".into();
            harness.repo.save(ctx, &fetched.person)?;
            Err::<(), _>(CoreError::recoverable("validation warning"))
        });

    report.check(
        matches!(result, Err(CoreError::Recoverable { .. })),
        "the recoverable failure should surface to the caller",
    );
    let observed = *completion.lock().expect("completion slot");
    report.check(
        observed == Some(Completion::Committed),
        "the observer should report a commit",
    );

    let name = harness.committed_name(id).unwrap_or_default();
    report.check(
        name == "written-before-failure",
        "the write must commit despite the recoverable failure",
    );
    report.note("recoverable failures do not force rollback under the default rule");
    report.note(format!(
        "the error surfaced, yet the committed name is {name:?}"
    ));
    report
}

/// Fatal failure under the default rule: the write rolls back.
pub fn fatal_failure_default(harness: &Harness) -> ScenarioReport {
    let mut report = ScenarioReport::new("fatal-failure-default");
    let person = harness.seed_alice();
    let id = person.id;

    let completion = Arc::new(Mutex::new(None));
    let completion_slot = Arc::clone(&completion);
    let result = harness
        .runner
        .execute(BoundaryConfig::default(), move |ctx| {
            ctx.on_completion(move |outcome| {
                *completion_slot.lock().expect("completion slot") = Some(outcome);
            });
            let mut fetched = harness.repo.find_by_id(ctx, id)?;
            fetched.person.name = "written-before-failure".into();
            harness.repo.save(ctx, &fetched.person)?;
            Err::<(), _>(CoreError::fatal("integrity broken"))
        });

    report.check(
        matches!(result, Err(CoreError::Fatal { .. })),
        "the fatal failure should surface to the caller",
    );
    let observed = *completion.lock().expect("completion slot");
    report.check(
        observed == Some(Completion::RolledBack),
        "the observer should report a rollback",
    );

    let name = harness.committed_name(id).unwrap_or_default();
    report.check(name == "Alice", "the write must be rolled back");
    report.note("fatal failures force rollback under the default rule");
    report.note(format!("the committed name is unchanged: {name:?}"));
    report
}

/// Recoverable failure with a rule that includes it: the write rolls back.
pub fn recoverable_failure_forced_rollback(harness: &Harness) -> ScenarioReport {
    let mut report = ScenarioReport::new("recoverable-failure-forced-rollback");
    let person = harness.seed_alice();

    let result = harness.runner.execute(
        BoundaryConfig::new().rollback_rule(RollbackRule::AllFailures),
        |ctx| {
            let mut fetched = harness.repo.find_by_id(ctx, person.id)?;
            fetched.person.name = "written-before-failure".into();
            harness.repo.save(ctx, &fetched.person)?;
            Err::<(), _>(CoreError::recoverable("validation warning"))
        },
    );

    report.check(
        matches!(result, Err(CoreError::Recoverable { .. })),
        "the recoverable failure should surface to the caller",
    );
    let name = harness.committed_name(person.id).unwrap_or_default();
    report.check(
        name == "Alice",
        "the rule explicitly includes recoverable failures, so the write rolls back",
    );
    report.note("the rollback rule was extended to cover recoverable failures");
    report.note(format!("the committed name is unchanged: {name:?}"));
    report
}
