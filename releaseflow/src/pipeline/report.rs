//! Run reports.

use crate::core::{AggregatedError, OutcomeAggregator, StagePhase, StageStatus};
use crate::errors::{FatalAbort, ReleaseflowError};
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

/// Terminal status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Every group ran and nothing was reported.
    Completed,
    /// Every group ran; some stages were skipped or failed without stopping the run.
    CompletedWithWarnings,
    /// A fatal error or a cancellation stopped the run.
    Aborted,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::CompletedWithWarnings => write!(f, "completed_with_warnings"),
            Self::Aborted => write!(f, "aborted"),
        }
    }
}

/// What happened to one stage.
#[derive(Debug, Clone, Serialize)]
pub struct StageRecord {
    /// Stage name.
    pub stage: String,
    /// Final status.
    pub status: StageStatus,
    /// The hook that failed, for failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<StagePhase>,
    /// Skip or failure reason.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Time spent in `run`, in milliseconds. Zero when `run` was not called.
    pub duration_ms: f64,
}

/// What happened to one group.
///
/// Stages that never started (after an abort or a cancellation) have no record.
#[derive(Debug, Clone, Serialize)]
pub struct GroupReport {
    /// Group name.
    pub name: String,
    /// Stage records in declaration order.
    pub stages: Vec<StageRecord>,
    /// The group's aggregated reasons, if any.
    pub error: Option<AggregatedError>,
}

impl GroupReport {
    /// Returns the record of a stage.
    #[must_use]
    pub fn stage(&self, name: &str) -> Option<&StageRecord> {
        self.stages.iter().find(|r| r.stage == name)
    }

    /// Returns true if a stage of this group failed.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.stages.iter().any(|r| r.status.is_failure())
    }
}

/// The result of [`ReleasePipeline::run`](super::ReleasePipeline::run).
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Pipeline name.
    pub pipeline: String,
    /// Run identifier.
    pub run_id: Uuid,
    /// Terminal status.
    pub status: RunStatus,
    /// Total time in milliseconds.
    pub duration_ms: f64,
    /// Reports of the groups that started, in order.
    pub groups: Vec<GroupReport>,
    /// The error that stopped the run, if one did.
    pub fatal: Option<FatalAbort>,
    /// The cancellation reason, if the run was cancelled from outside.
    pub cancelled: Option<String>,
}

impl RunReport {
    /// Returns every distinct reason across groups, in first-seen order.
    #[must_use]
    pub fn warnings(&self) -> Vec<String> {
        self.aggregate().reasons().to_vec()
    }

    /// Returns the record of a stage.
    #[must_use]
    pub fn stage(&self, name: &str) -> Option<&StageRecord> {
        self.groups.iter().find_map(|g| g.stage(name))
    }

    /// Returns the report of a group.
    #[must_use]
    pub fn group(&self, name: &str) -> Option<&GroupReport> {
        self.groups.iter().find(|g| g.name == name)
    }

    /// Returns true unless the run was aborted.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status != RunStatus::Aborted
    }

    /// Process exit code: 1 when aborted, or when warnings were reported and
    /// `warnings_are_errors` is set; 0 otherwise.
    #[must_use]
    pub fn exit_code(&self, warnings_are_errors: bool) -> i32 {
        match self.status {
            RunStatus::Aborted => 1,
            RunStatus::CompletedWithWarnings if warnings_are_errors => 1,
            _ => 0,
        }
    }

    /// Converts the report into a `Result`.
    ///
    /// # Errors
    ///
    /// `Cancelled` for an external cancellation, `Fatal` for any other abort,
    /// and `Aggregated` when warnings were reported and `warnings_are_errors` is set.
    pub fn into_result(mut self, warnings_are_errors: bool) -> Result<(), ReleaseflowError> {
        if let Some(reason) = self.cancelled.take() {
            return Err(ReleaseflowError::Cancelled(reason));
        }
        if let Some(fatal) = self.fatal.take() {
            return Err(fatal.into());
        }
        if warnings_are_errors {
            self.aggregate().evaluate()?;
        }
        Ok(())
    }

    fn aggregate(&self) -> OutcomeAggregator {
        let mut agg = OutcomeAggregator::new();
        for err in self.groups.iter().filter_map(|g| g.error.as_ref()) {
            for reason in err.reasons() {
                agg.remember_error(reason.clone(), err.is_skip());
            }
        }
        agg
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::StageOutcome;

    fn group_with(name: &str, skips: &[&str]) -> GroupReport {
        let mut agg = OutcomeAggregator::new();
        for reason in skips {
            agg.remember(&StageOutcome::skipped(*reason));
        }
        GroupReport {
            name: name.to_string(),
            stages: Vec::new(),
            error: agg.evaluate().err(),
        }
    }

    fn report(status: RunStatus, groups: Vec<GroupReport>) -> RunReport {
        RunReport {
            pipeline: "release".to_string(),
            run_id: Uuid::new_v4(),
            status,
            duration_ms: 0.0,
            groups,
            fatal: None,
            cancelled: None,
        }
    }

    #[test]
    fn test_warnings_are_distinct_across_groups() {
        let report = report(
            RunStatus::CompletedWithWarnings,
            vec![group_with("a", &["foo", "bar"]), group_with("b", &["bar", "baz"])],
        );
        assert_eq!(report.warnings(), vec!["foo", "bar", "baz"]);
    }

    #[test]
    fn test_exit_codes() {
        let clean = report(RunStatus::Completed, vec![]);
        assert_eq!(clean.exit_code(true), 0);

        let warned = report(RunStatus::CompletedWithWarnings, vec![group_with("a", &["foo"])]);
        assert_eq!(warned.exit_code(false), 0);
        assert_eq!(warned.exit_code(true), 1);

        let aborted = report(RunStatus::Aborted, vec![]);
        assert_eq!(aborted.exit_code(false), 1);
    }

    #[test]
    fn test_into_result() {
        let warned = report(RunStatus::CompletedWithWarnings, vec![group_with("a", &["foo"])]);
        assert!(warned.clone().into_result(false).is_ok());

        let err = warned.into_result(true).unwrap_err();
        assert!(matches!(err, ReleaseflowError::Aggregated(ref e) if e.is_skip()));
        assert_eq!(err.to_string(), "foo");

        let mut aborted = report(RunStatus::Aborted, vec![]);
        aborted.fatal = Some(FatalAbort::new("package", "docker: boom"));
        let err = aborted.into_result(false).unwrap_err();
        assert_eq!(err.to_string(), "release aborted in group 'package': docker: boom");
    }

    #[test]
    fn test_report_serializes() {
        let report = report(RunStatus::CompletedWithWarnings, vec![group_with("a", &["foo"])]);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "completed_with_warnings");
        assert_eq!(json["groups"][0]["error"]["reasons"][0], "foo");
    }
}
