//! The skip signal and the error type every stage hook returns.

use crate::errors::{ArtifactError, DataConflictError, TemplateError};
use thiserror::Error;

/// Signals that a stage opted out of the current run.
///
/// A skip is never a failure. Its display form is exactly the reason.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct SkipSignal {
    reason: String,
}

impl SkipSignal {
    /// Creates a new skip signal.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    /// Returns the reason.
    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// Errors returned by stage hooks.
#[derive(Debug, Error)]
pub enum StageError {
    /// The stage opted out.
    #[error(transparent)]
    Skip(#[from] SkipSignal),

    /// A configured template could not be resolved.
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// An artifact could not be registered or read.
    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    /// A resolved value was written twice.
    #[error(transparent)]
    DataConflict(#[from] DataConflictError),

    /// IO error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Any other plug-in error.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StageError {
    /// Creates a skip error with a reason.
    #[must_use]
    pub fn skip(reason: impl Into<String>) -> Self {
        Self::Skip(SkipSignal::new(reason))
    }

    /// Creates a plain failure from a message.
    #[must_use]
    pub fn msg(message: impl Into<String>) -> Self {
        Self::Other(anyhow::anyhow!(message.into()))
    }

    /// Returns true if this error is a skip.
    #[must_use]
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::Skip(_))
    }

    /// Returns the skip reason, if this error is a skip.
    #[must_use]
    pub fn skip_reason(&self) -> Option<&str> {
        match self {
            Self::Skip(signal) => Some(signal.reason()),
            _ => None,
        }
    }
}

/// Returns true if the error is a [`SkipSignal`], directly or wrapped in a [`StageError`].
#[must_use]
pub fn is_skip(err: &(dyn std::error::Error + 'static)) -> bool {
    if err.is::<SkipSignal>() {
        return true;
    }
    if let Some(stage_err) = err.downcast_ref::<StageError>() {
        return stage_err.is_skip();
    }
    if let Some(aggregated) = err.downcast_ref::<super::AggregatedError>() {
        return aggregated.is_skip();
    }
    false
}
