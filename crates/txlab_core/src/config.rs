//! Boundary configuration.

use crate::error::FailureCategory;
use txlab_store::IsolationLevel;

/// How a boundary relates to an already-active ambient boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Propagation {
    /// Join the ambient boundary if one is active, otherwise start a new
    /// one. A joined invocation's own configuration is NOT applied.
    #[default]
    Required,
    /// Always start a new boundary, suspending any ambient one. Commits and
    /// rolls back independently of the suspended boundary's later fate.
    RequiresNew,
    /// Create a sub-boundary within the ambient one: its rollback does not
    /// unwind the parent, but its writes only become durable if the parent
    /// commits. Without an ambient boundary, behaves like `Required`.
    Nested,
}

/// Which failure categories force a rollback when the body fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RollbackRule {
    /// Default policy: only [`FailureCategory::Fatal`] failures roll back;
    /// a recoverable failure surfaces to the caller but the writes commit.
    #[default]
    FatalOnly,
    /// Every failure rolls back, recoverable ones included.
    AllFailures,
}

impl RollbackRule {
    /// Whether a failure of the given category forces rollback.
    #[must_use]
    pub fn forces_rollback(self, category: FailureCategory) -> bool {
        match self {
            Self::FatalOnly => category == FailureCategory::Fatal,
            Self::AllFailures => true,
        }
    }
}

/// Declared configuration for one transaction boundary.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoundaryConfig {
    /// Relation to an ambient boundary.
    pub propagation: Propagation,
    /// Read visibility policy for a boundary that opens a transaction.
    pub isolation: IsolationLevel,
    /// Whether writes are forbidden inside the boundary.
    pub read_only: bool,
    /// Which failure categories force rollback.
    pub rollback_rule: RollbackRule,
}

impl BoundaryConfig {
    /// Creates a configuration with default values: `Required`,
    /// `ReadCommitted`, read-write, `FatalOnly`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the propagation mode.
    #[must_use]
    pub const fn propagation(mut self, value: Propagation) -> Self {
        self.propagation = value;
        self
    }

    /// Sets the isolation level.
    #[must_use]
    pub const fn isolation(mut self, value: IsolationLevel) -> Self {
        self.isolation = value;
        self
    }

    /// Marks the boundary read-only.
    #[must_use]
    pub const fn read_only(mut self, value: bool) -> Self {
        self.read_only = value;
        self
    }

    /// Sets the rollback rule.
    #[must_use]
    pub const fn rollback_rule(mut self, value: RollbackRule) -> Self {
        self.rollback_rule = value;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = BoundaryConfig::default();
        assert_eq!(config.propagation, Propagation::Required);
        assert_eq!(config.isolation, IsolationLevel::ReadCommitted);
        assert!(!config.read_only);
        assert_eq!(config.rollback_rule, RollbackRule::FatalOnly);
    }

    #[test]
    fn builder_pattern() {
        let config = BoundaryConfig::new()
            .propagation(Propagation::RequiresNew)
            .isolation(IsolationLevel::Serializable)
            .read_only(true)
            .rollback_rule(RollbackRule::AllFailures);

        assert_eq!(config.propagation, Propagation::RequiresNew);
        assert_eq!(config.isolation, IsolationLevel::Serializable);
        assert!(config.read_only);
        assert_eq!(config.rollback_rule, RollbackRule::AllFailures);
    }

    #[test]
    fn default_rule_keeps_recoverable_failures() {
        assert!(!RollbackRule::FatalOnly.forces_rollback(FailureCategory::Recoverable));
        assert!(RollbackRule::FatalOnly.forces_rollback(FailureCategory::Fatal));
    }

    #[test]
    fn all_failures_rule_rolls_back_everything() {
        assert!(RollbackRule::AllFailures.forces_rollback(FailureCategory::Recoverable));
        assert!(RollbackRule::AllFailures.forces_rollback(FailureCategory::Fatal));
    }
}
