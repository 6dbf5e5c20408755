//! Eager vs lazy association fetching.

use crate::harness::Harness;
use crate::report::ScenarioReport;
use txlab_core::{BoundaryConfig, CoreError};

/// Loads the person together with their contact card in one boundary.
///
/// Everything needed later is fetched up front, so the association stays
/// accessible after the boundary closes.
pub fn read_with_eager_fetch(harness: &Harness) -> ScenarioReport {
    let mut report = ScenarioReport::new("read-with-eager-fetch");
    let person = harness.seed_alice();

    let fetched = harness.runner.execute(BoundaryConfig::default(), |ctx| {
        harness.repo.find_by_id_eager(ctx, person.id)
    });

    match fetched {
        Ok(fetched) => {
            report.note(format!(
                "loaded {} and contact card in one boundary",
                fetched.person.name
            ));
            report.check(fetched.contact.is_loaded(), "contact should be loaded");
            match fetched.contact.get() {
                Ok(card) => report.note(format!(
                    "contact still readable after the boundary closed: {}",
                    card.email
                )),
                Err(err) => report.fail(format!("eager contact should stay readable: {err}")),
            }
        }
        Err(err) => report.fail(format!("eager fetch failed: {err}")),
    }
    report
}

/// Loads the person only; the contact card stays deferred.
///
/// Inside the boundary the deferred association loads on demand. Once the
/// boundary closes the handle is detached for good, and access fails with
/// `StaleAccess`.
pub fn read_without_eager_fetch(harness: &Harness) -> ScenarioReport {
    let mut report = ScenarioReport::new("read-without-eager-fetch");
    let person = harness.seed_alice();

    let fetched = harness.runner.execute(BoundaryConfig::default(), |ctx| {
        let fetched = harness.repo.find_by_id(ctx, person.id)?;
        // Still inside the owning boundary: the deferred card loads fine.
        let card = fetched.contact.get()?;
        Ok((fetched, card))
    });

    match fetched {
        Ok((fetched, card)) => {
            report.note(format!(
                "loaded {} lazily; in-boundary access to the card worked ({})",
                fetched.person.name, card.email
            ));
            match fetched.contact.get() {
                Err(CoreError::StaleAccess) => {
                    report.note("touching the deferred card after the boundary closed: StaleAccess");
                }
                Ok(_) => report.fail("deferred card should be stale outside its boundary"),
                Err(err) => report.fail(format!("expected StaleAccess, got: {err}")),
            }
        }
        Err(err) => report.fail(format!("lazy fetch failed: {err}")),
    }
    report
}
