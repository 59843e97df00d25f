//! Stage groups: the unit of ordering and failure handling.

use crate::stages::Stage;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How the stages of a group are run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum ExecutionMode {
    /// One after another, in declaration order.
    Sequential,
    /// Concurrently, at most `max_parallelism` at a time.
    Concurrent {
        /// Upper bound on stages running at once.
        max_parallelism: usize,
    },
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sequential => write!(f, "sequential"),
            Self::Concurrent { max_parallelism } => write!(f, "concurrent({max_parallelism})"),
        }
    }
}

/// What a stage failure does to the rest of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// The first failure stops the group and the run.
    Abort,
    /// Failures are aggregated with the group's other reasons and the run goes on.
    Continue,
}

impl FailurePolicy {
    /// The default policy for a mode: `Abort` for sequential groups,
    /// `Continue` for concurrent ones.
    #[must_use]
    pub fn default_for(mode: ExecutionMode) -> Self {
        match mode {
            ExecutionMode::Sequential => Self::Abort,
            ExecutionMode::Concurrent { .. } => Self::Continue,
        }
    }
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Abort => write!(f, "abort"),
            Self::Continue => write!(f, "continue"),
        }
    }
}

/// An ordered set of stages sharing a mode and a failure policy.
#[derive(Debug)]
pub struct StageGroup {
    pub(crate) name: String,
    pub(crate) mode: ExecutionMode,
    pub(crate) policy: FailurePolicy,
    pub(crate) stages: Vec<Box<dyn Stage>>,
}

impl StageGroup {
    /// Creates a group whose stages run one after another.
    #[must_use]
    pub fn sequential(name: impl Into<String>) -> Self {
        Self::new(name, ExecutionMode::Sequential)
    }

    /// Creates a group whose stages run concurrently, at most `max_parallelism` at once.
    #[must_use]
    pub fn concurrent(name: impl Into<String>, max_parallelism: usize) -> Self {
        Self::new(name, ExecutionMode::Concurrent { max_parallelism })
    }

    /// Creates a group with an explicit mode.
    #[must_use]
    pub fn new(name: impl Into<String>, mode: ExecutionMode) -> Self {
        Self {
            name: name.into(),
            mode,
            policy: FailurePolicy::default_for(mode),
            stages: Vec::new(),
        }
    }

    /// Appends a stage.
    #[must_use]
    pub fn with_stage(self, stage: impl Stage + 'static) -> Self {
        self.with_boxed_stage(Box::new(stage))
    }

    /// Appends an already boxed stage.
    #[must_use]
    pub fn with_boxed_stage(mut self, stage: Box<dyn Stage>) -> Self {
        self.stages.push(stage);
        self
    }

    /// Overrides the failure policy.
    #[must_use]
    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Returns the group name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the execution mode.
    #[must_use]
    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    /// Returns the failure policy.
    #[must_use]
    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Returns the stage names in declaration order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Returns true if the group has no stages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}
