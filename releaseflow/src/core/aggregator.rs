//! Deduplicating collector for skip and failure reasons.

use super::StageOutcome;
use serde::Serialize;
use thiserror::Error;

/// The reasons gathered by an [`OutcomeAggregator`], reported as one error.
///
/// Displays as the reasons joined with `", "` in first-seen order.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{}", .reasons.join(", "))]
pub struct AggregatedError {
    reasons: Vec<String>,
    has_failures: bool,
}

impl AggregatedError {
    /// Returns the distinct reasons in first-seen order.
    #[must_use]
    pub fn reasons(&self) -> &[String] {
        &self.reasons
    }

    /// Returns true when every remembered reason came from a skip.
    #[must_use]
    pub fn is_skip(&self) -> bool {
        !self.has_failures
    }
}

/// Collects reasons from sibling stages so they can be reported together.
#[derive(Debug, Default)]
pub struct OutcomeAggregator {
    reasons: Vec<String>,
    has_failures: bool,
}

impl OutcomeAggregator {
    /// Creates an empty aggregator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Remembers an outcome. Successes are ignored.
    pub fn remember(&mut self, outcome: &StageOutcome) {
        if let Some(reason) = outcome.reason() {
            self.remember_error(reason, outcome.is_skip());
        }
    }

    /// Remembers a raw reason.
    ///
    /// A reason equal to one already remembered is dropped.
    pub fn remember_error(&mut self, reason: impl Into<String>, is_skip: bool) {
        let reason = reason.into();
        if !is_skip {
            self.has_failures = true;
        }
        if !self.reasons.contains(&reason) {
            self.reasons.push(reason);
        }
    }

    /// Reduces the remembered reasons to a single result.
    pub fn evaluate(&self) -> Result<(), AggregatedError> {
        if self.reasons.is_empty() {
            return Ok(());
        }
        Err(AggregatedError {
            reasons: self.reasons.clone(),
            has_failures: self.has_failures,
        })
    }

    /// Returns the distinct reasons in first-seen order.
    #[must_use]
    pub fn reasons(&self) -> &[String] {
        &self.reasons
    }

    /// Returns the number of distinct reasons.
    #[must_use]
    pub fn len(&self) -> usize {
        self.reasons.len()
    }

    /// Returns true if nothing was remembered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reasons.is_empty()
    }

    /// Returns true if any remembered reason came from a failure.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.has_failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{is_skip, StageError, StagePhase};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_skip_reasons_are_deduplicated() {
        let mut agg = OutcomeAggregator::new();
        agg.remember(&StageOutcome::skipped("foo"));
        agg.remember(&StageOutcome::skipped("bar"));
        agg.remember(&StageOutcome::skipped("dupe"));
        agg.remember(&StageOutcome::skipped("dupe"));

        let err = agg.evaluate().unwrap_err();
        assert_eq!(err.to_string(), "foo, bar, dupe");
        assert!(err.is_skip());
        assert!(is_skip(&err));
        assert!(!agg.has_failures());
    }

    #[test]
    fn test_empty_aggregator_is_ok() {
        let agg = OutcomeAggregator::new();
        assert!(agg.evaluate().is_ok());
        assert!(agg.is_empty());
    }

    #[test]
    fn test_success_is_ignored() {
        let mut agg = OutcomeAggregator::new();
        agg.remember(&StageOutcome::Success);
        assert!(agg.evaluate().is_ok());
    }

    #[test]
    fn test_failure_mixes_with_skips() {
        let mut agg = OutcomeAggregator::new();
        agg.remember(&StageOutcome::skipped("disabled"));
        agg.remember(&StageOutcome::failed(
            "slack",
            StagePhase::Run,
            StageError::msg("timeout"),
        ));

        let err = agg.evaluate().unwrap_err();
        assert_eq!(err.reasons(), ["disabled", "slack: timeout"]);
        assert!(!err.is_skip());
        assert!(agg.has_failures());
    }

    #[test]
    fn test_remember_error_order_is_first_seen() {
        let mut agg = OutcomeAggregator::new();
        agg.remember_error("b", false);
        agg.remember_error("a", false);
        agg.remember_error("b", false);

        assert_eq!(agg.len(), 2);
        assert_eq!(agg.evaluate().unwrap_err().to_string(), "b, a");
    }
}
