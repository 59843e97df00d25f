//! Stage outcomes.

use super::{SkipSignal, StageError, StagePhase, StageStatus};
use thiserror::Error;

/// A stage failure, tagged with the stage and the hook that failed.
#[derive(Debug, Error)]
#[error("{stage}: {source}")]
pub struct StageFailure {
    /// The stage name.
    pub stage: String,
    /// The hook that failed.
    pub phase: StagePhase,
    /// The underlying error.
    #[source]
    pub source: StageError,
}

impl StageFailure {
    /// Creates a new stage failure.
    #[must_use]
    pub fn new(stage: impl Into<String>, phase: StagePhase, source: StageError) -> Self {
        Self {
            stage: stage.into(),
            phase,
            source,
        }
    }
}

/// The result of one stage in one run.
///
/// An outcome is exactly one of success, skip or failure.
#[derive(Debug)]
pub enum StageOutcome {
    /// The stage ran to completion.
    Success,
    /// The stage opted out.
    Skipped(SkipSignal),
    /// The stage failed.
    Failed(StageFailure),
}

impl StageOutcome {
    /// Creates a skipped outcome.
    #[must_use]
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped(SkipSignal::new(reason))
    }

    /// Creates a failed outcome.
    #[must_use]
    pub fn failed(stage: impl Into<String>, phase: StagePhase, source: StageError) -> Self {
        Self::Failed(StageFailure::new(stage, phase, source))
    }

    /// Converts a hook result into an outcome.
    ///
    /// `Err(StageError::Skip(_))` becomes a skip; any other error becomes a failure.
    #[must_use]
    pub fn from_result(stage: &str, phase: StagePhase, result: Result<(), StageError>) -> Self {
        match result {
            Ok(()) => Self::Success,
            Err(StageError::Skip(signal)) => Self::Skipped(signal),
            Err(err) => Self::failed(stage, phase, err),
        }
    }

    /// Returns true for a skipped outcome.
    #[must_use]
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::Skipped(_))
    }

    /// Returns true for a successful outcome.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Returns true for a failed outcome.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Returns the status.
    #[must_use]
    pub fn status(&self) -> StageStatus {
        match self {
            Self::Success => StageStatus::Ok,
            Self::Skipped(_) => StageStatus::Skip,
            Self::Failed(_) => StageStatus::Fail,
        }
    }

    /// Returns the user-facing reason for a skip or failure.
    #[must_use]
    pub fn reason(&self) -> Option<String> {
        match self {
            Self::Success => None,
            Self::Skipped(signal) => Some(signal.reason().to_string()),
            Self::Failed(failure) => Some(failure.to_string()),
        }
    }
}
