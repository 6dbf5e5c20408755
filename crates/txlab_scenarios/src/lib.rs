//! # txlab Scenarios
//!
//! The demonstration catalog: one named scenario per transaction pitfall,
//! each tagged with the boundary configuration it exercises, plus the
//! orchestration that runs them.
//!
//! Every scenario builds against a fresh [`Harness`] seeded with one person
//! ("Alice", 30, with a contact card), observes the documented behavior,
//! and narrates what happened. A scenario that deviates reports
//! `Unexpected`; it never aborts the run.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod fetching;
mod harness;
mod isolation;
mod lost_update;
mod propagation;
mod read_only;
mod report;
mod rollback;
mod self_invocation;

pub use harness::Harness;
pub use report::{ScenarioOutcome, ScenarioReport};

/// One entry in the demonstration catalog.
pub struct Scenario {
    /// Catalog name, as printed and matched by `--scenario`.
    pub name: &'static str,
    /// One-line summary of the pitfall or fix.
    pub summary: &'static str,
    run: fn(&Harness) -> ScenarioReport,
}

impl Scenario {
    /// Runs the scenario against a harness.
    #[must_use]
    pub fn run(&self, harness: &Harness) -> ScenarioReport {
        (self.run)(harness)
    }
}

impl std::fmt::Debug for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scenario").field("name", &self.name).finish()
    }
}

/// The full demonstration catalog, in narration order.
#[must_use]
pub fn catalog() -> Vec<Scenario> {
    vec![
        Scenario {
            name: "read-with-eager-fetch",
            summary: "association fetched with its owner stays accessible",
            run: fetching::read_with_eager_fetch,
        },
        Scenario {
            name: "read-without-eager-fetch",
            summary: "deferred association fails with StaleAccess outside its boundary",
            run: fetching::read_without_eager_fetch,
        },
        Scenario {
            name: "concurrent-update",
            summary: "unprotected read-modify-write silently loses an update",
            run: lost_update::concurrent_update,
        },
        Scenario {
            name: "concurrent-update-protected-optimistic",
            summary: "version guard turns the race into an OptimisticConflict",
            run: lost_update::concurrent_update_protected_optimistic,
        },
        Scenario {
            name: "concurrent-update-protected-pessimistic",
            summary: "row lock serializes the writers; nothing is lost",
            run: lost_update::concurrent_update_protected_pessimistic,
        },
        Scenario {
            name: "read-only-mutation",
            summary: "a write under a read-only boundary fails ReadOnlyViolation",
            run: read_only::read_only_mutation,
        },
        Scenario {
            name: "self-invoked-nested-call",
            summary: "a direct body call silently loses the callee's boundary config",
            run: self_invocation::self_invoked_nested_call,
        },
        Scenario {
            name: "separately-invoked-call",
            summary: "the same body via the runner gets its declared boundary",
            run: self_invocation::separately_invoked_call,
        },
        Scenario {
            name: "nested-propagation",
            summary: "a nested boundary is a sub-transaction of its parent",
            run: propagation::nested_propagation,
        },
        Scenario {
            name: "requires-new-propagation",
            summary: "a requires-new boundary commits independently of its parent",
            run: propagation::requires_new_propagation,
        },
        Scenario {
            name: "isolation-visibility",
            summary: "read-uncommitted observes a value that never commits",
            run: isolation::isolation_visibility,
        },
        Scenario {
            name: "recoverable-failure-default",
            summary: "a recoverable failure surfaces but the write commits",
            run: rollback::recoverable_failure_default,
        },
        Scenario {
            name: "fatal-failure-default",
            summary: "a fatal failure rolls the write back",
            run: rollback::fatal_failure_default,
        },
        Scenario {
            name: "recoverable-failure-forced-rollback",
            summary: "a rule naming the recoverable category forces the rollback",
            run: rollback::recoverable_failure_forced_rollback,
        },
    ]
}

/// Runs the catalog, one fresh harness per scenario.
///
/// With a filter only the matching scenario runs. Scenario deviations are
/// reported, never fatal.
#[must_use]
pub fn run_catalog(filter: Option<&str>) -> Vec<ScenarioReport> {
    catalog()
        .iter()
        .filter(|scenario| filter.map_or(true, |name| scenario.name == name))
        .map(|scenario| {
            tracing::info!(scenario = scenario.name, "running");
            let harness = Harness::new();
            scenario.run(&harness)
        })
        .collect()
}
