//! Test assertions for run reports.

use crate::core::StageStatus;
use crate::pipeline::{RunReport, RunStatus};

/// Asserts the terminal status of a run.
pub fn assert_run_status(report: &RunReport, expected: RunStatus) {
    assert_eq!(
        report.status, expected,
        "Expected run status {:?}, got {:?} (warnings: {:?}, fatal: {:?})",
        expected, report.status, report.warnings(), report.fatal
    );
}

/// Asserts the status of one stage.
pub fn assert_stage_status(report: &RunReport, stage: &str, expected: StageStatus) {
    let record = report
        .stage(stage)
        .unwrap_or_else(|| panic!("Expected a record for stage '{stage}', but it never ran"));
    assert_eq!(
        record.status, expected,
        "Expected stage '{}' to be {:?}, got {:?} ({:?})",
        stage, expected, record.status, record.reason
    );
}

/// Asserts that a stage was skipped with the given reason.
pub fn assert_stage_skipped(report: &RunReport, stage: &str, reason: &str) {
    assert_stage_status(report, stage, StageStatus::Skip);
    let actual = report.stage(stage).and_then(|r| r.reason.as_deref());
    assert_eq!(
        actual,
        Some(reason),
        "Expected stage '{stage}' to be skipped with '{reason}', got {actual:?}"
    );
}

/// Asserts that a stage has no record: it never started.
pub fn assert_stage_not_run(report: &RunReport, stage: &str) {
    assert!(
        report.stage(stage).is_none(),
        "Expected stage '{stage}' not to run, got {:?}",
        report.stage(stage)
    );
}

/// Asserts that some warning contains `needle`.
pub fn assert_warning(report: &RunReport, needle: &str) {
    let warnings = report.warnings();
    assert!(
        warnings.iter().any(|w| w.contains(needle)),
        "Expected a warning containing '{needle}', got {warnings:?}"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{OutcomeAggregator, StageOutcome};
    use crate::pipeline::{GroupReport, StageRecord};
    use uuid::Uuid;

    fn report() -> RunReport {
        let mut agg = OutcomeAggregator::new();
        agg.remember(&StageOutcome::skipped("docker skipped"));
        RunReport {
            pipeline: "release".to_string(),
            run_id: Uuid::new_v4(),
            status: RunStatus::CompletedWithWarnings,
            duration_ms: 1.0,
            groups: vec![GroupReport {
                name: "package".to_string(),
                stages: vec![
                    StageRecord {
                        stage: "docker".to_string(),
                        status: StageStatus::Skip,
                        phase: None,
                        reason: Some("docker skipped".to_string()),
                        duration_ms: 0.0,
                    },
                    StageRecord {
                        stage: "checksum".to_string(),
                        status: StageStatus::Ok,
                        phase: None,
                        reason: None,
                        duration_ms: 0.5,
                    },
                ],
                error: agg.evaluate().err(),
            }],
            fatal: None,
            cancelled: None,
        }
    }

    #[test]
    fn test_assertions_pass() {
        let report = report();
        assert_run_status(&report, RunStatus::CompletedWithWarnings);
        assert_stage_status(&report, "checksum", StageStatus::Ok);
        assert_stage_skipped(&report, "docker", "docker skipped");
        assert_stage_not_run(&report, "webhook");
        assert_warning(&report, "docker");
    }

    #[test]
    #[should_panic(expected = "Expected run status")]
    fn test_assert_run_status_fails() {
        assert_run_status(&report(), RunStatus::Completed);
    }

    #[test]
    #[should_panic(expected = "never ran")]
    fn test_assert_stage_status_missing() {
        assert_stage_status(&report(), "webhook", StageStatus::Ok);
    }

    #[test]
    #[should_panic(expected = "Expected a warning")]
    fn test_assert_warning_fails() {
        assert_warning(&report(), "webhook");
    }
}
