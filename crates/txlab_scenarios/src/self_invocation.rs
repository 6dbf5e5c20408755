//! Self-invocation: losing a callee's boundary configuration.
//!
//! A boundary exists only where the runner opened one. Calling another
//! operation's body function directly is just a function call: the
//! callee's declared configuration is silently not applied. The same body
//! invoked through the runner behaves as declared.

use crate::harness::Harness;
use crate::report::ScenarioReport;
use txlab_core::{
    BoundaryConfig, BoundaryCtx, CoreError, CoreResult, Propagation, RecordId, RecordRepository,
};

/// Body of the audit-rename operation.
///
/// Its intended boundary is [`audit_rename_config`] (`RequiresNew`), so the
/// rename commits independently of the caller. The intent only takes effect
/// when the body is invoked through the runner.
fn audit_rename(
    repo: &RecordRepository,
    ctx: &mut BoundaryCtx,
    id: RecordId,
    name: &str,
) -> CoreResult<()> {
    let mut fetched = repo.find_by_id(ctx, id)?;
    fetched.person.name = name.into();
    repo.save(ctx, &fetched.person)
}

/// The boundary the audit-rename operation declares for itself.
fn audit_rename_config() -> BoundaryConfig {
    BoundaryConfig::new().propagation(Propagation::RequiresNew)
}

/// Caller invokes the callee's body directly, then fails.
///
/// The callee intended `RequiresNew`, which would have committed the rename
/// independently. Invoked directly, it simply runs inside the caller's
/// boundary, and the caller's rollback takes the rename with it.
pub fn self_invoked_nested_call(harness: &Harness) -> ScenarioReport {
    let mut report = ScenarioReport::new("self-invoked-nested-call");
    let person = harness.seed_alice();

    let result = harness.runner.execute(BoundaryConfig::default(), |ctx| {
        audit_rename(&harness.repo, ctx, person.id, "renamed-by-audit")?;
        Err::<(), _>(CoreError::fatal("caller fails after the direct call"))
    });
    report.check(result.is_err(), "caller should fail");

    let name = harness.committed_name(person.id).unwrap_or_default();
    report.check(
        name == "Alice",
        "direct call must not get its own boundary; the rename rolls back with the caller",
    );
    report.note("callee's RequiresNew configuration was silently not applied");
    report.note(format!("caller rolled back and took the rename with it; name is {name:?}"));
    report
}

/// The same callee invoked through the boundary-aware entry point.
///
/// Now `RequiresNew` applies: the rename commits on its own and survives
/// the caller's rollback.
pub fn separately_invoked_call(harness: &Harness) -> ScenarioReport {
    let mut report = ScenarioReport::new("separately-invoked-call");
    let person = harness.seed_alice();

    let inner = harness.runner.clone();
    let result = harness.runner.execute(BoundaryConfig::default(), |_ctx| {
        inner.execute(audit_rename_config(), |ctx| {
            audit_rename(&harness.repo, ctx, person.id, "renamed-by-audit")
        })?;
        Err::<(), _>(CoreError::fatal("caller fails after the boundary-aware call"))
    });
    report.check(result.is_err(), "caller should fail");

    let name = harness.committed_name(person.id).unwrap_or_default();
    report.check(
        name == "renamed-by-audit",
        "the callee's own boundary should have committed independently",
    );
    report.note("callee ran under its declared RequiresNew boundary");
    report.note(format!(
        "caller rolled back, but the rename survived; name is {name:?}"
    ));
    report
}
