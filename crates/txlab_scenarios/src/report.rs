//! Scenario reports.

use serde::Serialize;

/// Outcome of one scenario run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ScenarioOutcome {
    /// The observed behavior matched the catalog entry.
    Demonstrated,
    /// Something other than the documented behavior was observed.
    Unexpected {
        /// What deviated.
        detail: String,
    },
}

/// Narrated result of one scenario.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    /// Catalog name of the scenario.
    pub name: &'static str,
    /// Human-readable narration, in observation order.
    pub narration: Vec<String>,
    /// Whether the documented behavior was observed.
    pub outcome: ScenarioOutcome,
}

impl ScenarioReport {
    /// Starts a report for a scenario; outcome is `Demonstrated` until a
    /// check fails.
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            narration: Vec::new(),
            outcome: ScenarioOutcome::Demonstrated,
        }
    }

    /// Appends a narration line.
    pub fn note(&mut self, line: impl Into<String>) {
        self.narration.push(line.into());
    }

    /// Records a deviation. The first deviation wins.
    pub fn fail(&mut self, detail: impl Into<String>) {
        let detail = detail.into();
        tracing::warn!(scenario = self.name, %detail, "unexpected scenario behavior");
        if self.outcome == ScenarioOutcome::Demonstrated {
            self.outcome = ScenarioOutcome::Unexpected { detail };
        }
    }

    /// Checks an expected observation, recording a deviation if it fails.
    pub fn check(&mut self, condition: bool, detail: impl Into<String>) {
        if !condition {
            self.fail(detail);
        }
    }

    /// Whether the scenario behaved as documented.
    #[must_use]
    pub fn is_demonstrated(&self) -> bool {
        self.outcome == ScenarioOutcome::Demonstrated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_report_is_demonstrated() {
        let report = ScenarioReport::new("sample");
        assert!(report.is_demonstrated());
    }

    #[test]
    fn first_failure_wins() {
        let mut report = ScenarioReport::new("sample");
        report.check(true, "fine");
        report.fail("first");
        report.fail("second");
        assert_eq!(
            report.outcome,
            ScenarioOutcome::Unexpected {
                detail: "first".into()
            }
        );
    }
}
