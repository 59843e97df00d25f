//! Stage status and phase enums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The terminal status of a stage within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    /// Stage completed successfully.
    Ok,
    /// Stage opted out.
    Skip,
    /// Stage failed.
    Fail,
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "ok"),
            Self::Skip => write!(f, "skip"),
            Self::Fail => write!(f, "fail"),
        }
    }
}

impl StageStatus {
    /// Returns true if the status does not count as a failure.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Ok | Self::Skip)
    }

    /// Returns true if the status indicates failure.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Fail)
    }
}

/// The stage hook that produced an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StagePhase {
    /// `apply_defaults`.
    Defaults,
    /// `skip`.
    Skip,
    /// `run`.
    Run,
}

impl fmt::Display for StagePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Defaults => write!(f, "defaults"),
            Self::Skip => write!(f, "skip"),
            Self::Run => write!(f, "run"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_status_display() {
        assert_eq!(StageStatus::Ok.to_string(), "ok");
        assert_eq!(StageStatus::Skip.to_string(), "skip");
        assert_eq!(StageStatus::Fail.to_string(), "fail");
    }

    #[test]
    fn test_skip_is_not_failure() {
        assert!(StageStatus::Skip.is_success());
        assert!(!StageStatus::Skip.is_failure());
        assert!(StageStatus::Fail.is_failure());
    }

    #[test]
    fn test_stage_phase_serialize() {
        let json = serde_json::to_string(&StagePhase::Defaults).unwrap();
        assert_eq!(json, r#""defaults""#);

        let phase: StagePhase = serde_json::from_str(r#""run""#).unwrap();
        assert_eq!(phase, StagePhase::Run);
    }
}
