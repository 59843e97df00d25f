//! Run identity for correlating a release run.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifies one release run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunIdentity {
    /// The unique ID for this run.
    pub run_id: Uuid,
}

impl Default for RunIdentity {
    fn default() -> Self {
        Self::new()
    }
}

impl RunIdentity {
    /// Creates a new run identity with a generated ID.
    #[must_use]
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
        }
    }

    /// Creates a run identity with a specific ID.
    #[must_use]
    pub fn with_run_id(run_id: Uuid) -> Self {
        Self { run_id }
    }
}

impl std::fmt::Display for RunIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.run_id)
    }
}
