//! Isolation-level visibility differences.

use crate::harness::Harness;
use crate::report::ScenarioReport;
use std::sync::{Arc, Barrier};
use std::thread;
use txlab_core::{BoundaryConfig, CoreError, CoreResult, IsolationLevel};

/// The same read under `ReadUncommitted` and `ReadCommitted`, concurrent
/// with a writer whose update never commits.
///
/// The dirty reader observes the staged value; the committed reader does
/// not. After the writer rolls back, the dirty value is nowhere: the
/// dirty reader saw data that never existed.
pub fn isolation_visibility(harness: &Harness) -> ScenarioReport {
    let mut report = ScenarioReport::new("isolation-visibility");
    let person = harness.seed_alice();

    let staged = Arc::new(Barrier::new(2));
    let done = Arc::new(Barrier::new(2));
    let writer = {
        let runner = harness.runner.clone();
        let repo = harness.repo.clone();
        let staged = Arc::clone(&staged);
        let done = Arc::clone(&done);
        let id = person.id;
        thread::spawn(move || -> CoreResult<()> {
            runner.execute(BoundaryConfig::default(), |ctx| {
                let mut fetched = repo.find_by_id(ctx, id)?;
                fetched.person.name = "uncommitted-update".into();
                repo.save(ctx, &fetched.person)?;
                staged.wait();
                done.wait();
                Err(CoreError::fatal("writer aborts; the update never commits"))
            })
        })
    };

    staged.wait();
    let read_name = |isolation: IsolationLevel| -> CoreResult<String> {
        harness
            .runner
            .execute(BoundaryConfig::new().isolation(isolation), |ctx| {
                Ok(harness.repo.find_by_id(ctx, person.id)?.person.name)
            })
    };
    let dirty = read_name(IsolationLevel::ReadUncommitted);
    let committed = read_name(IsolationLevel::ReadCommitted);
    done.wait();

    let writer_result = writer.join().expect("writer thread panicked");
    report.check(writer_result.is_err(), "the writer should abort");

    match &dirty {
        Ok(name) => {
            report.check(
                name == "uncommitted-update",
                "the read-uncommitted reader should observe the staged value",
            );
            report.note(format!("read-uncommitted observed {name:?}"));
        }
        Err(err) => report.fail(format!("dirty read failed: {err}")),
    }
    match &committed {
        Ok(name) => {
            report.check(
                name == "Alice",
                "the read-committed reader must not observe staged data",
            );
            report.note(format!("read-committed observed {name:?}"));
        }
        Err(err) => report.fail(format!("committed read failed: {err}")),
    }

    let final_name = harness.committed_name(person.id).unwrap_or_default();
    report.check(final_name == "Alice", "the dirty value must never commit");
    report.note(format!(
        "writer rolled back; the dirty reader saw a value that never existed ({final_name:?} remains)"
    ));
    report
}
