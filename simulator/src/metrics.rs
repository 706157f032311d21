//! Simulation metrics.

use serde::Serialize;

/// Outcome counts for a simulation run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SimulationMetrics {
    /// Engine operations issued.
    pub total_operations: u64,
    /// Operations that succeeded as expected.
    pub succeeded: u64,
    /// Operations rejected with the expected error.
    pub expected_rejections: u64,
    /// Operations whose outcome differed from the scenario.
    pub unexpected_outcomes: u64,
    /// Assertions that passed.
    pub assertions_passed: u64,
    /// Assertions that failed.
    pub assertions_failed: u64,
    /// Steps after which escrow differed from outstanding obligations.
    pub conservation_violations: u64,
}

impl SimulationMetrics {
    /// Create new metrics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an operation outcome.
    pub fn record_operation(&mut self, matched: bool, was_error: bool) {
        self.total_operations += 1;
        match (matched, was_error) {
            (true, false) => self.succeeded += 1,
            (true, true) => self.expected_rejections += 1,
            (false, _) => self.unexpected_outcomes += 1,
        }
    }

    /// Record an assertion outcome.
    pub fn record_assertion(&mut self, passed: bool) {
        if passed {
            self.assertions_passed += 1;
        } else {
            self.assertions_failed += 1;
        }
    }

    /// Record a conservation check.
    pub fn record_conservation(&mut self, held: bool) {
        if !held {
            self.conservation_violations += 1;
        }
    }

    /// Whether the run matched its scenario.
    pub fn is_clean(&self) -> bool {
        self.unexpected_outcomes == 0
            && self.assertions_failed == 0
            && self.conservation_violations == 0
    }

    /// Share of operations that behaved as the scenario expected.
    pub fn match_rate(&self) -> f64 {
        if self.total_operations == 0 {
            return 0.0;
        }

        (self.succeeded + self.expected_rejections) as f64 / self.total_operations as f64
    }
}
