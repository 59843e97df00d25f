//! Error types for the releaseflow engine.
//!
//! Stage-level errors (`StageError`, `StageFailure`, `AggregatedError`) live in
//! [`crate::core`] next to the outcome types they describe; this module holds the
//! substrate errors and the top-level [`ReleaseflowError`].

use crate::core::AggregatedError;
use serde::Serialize;
use thiserror::Error;

/// The main error type for releaseflow operations.
#[derive(Debug, Error)]
pub enum ReleaseflowError {
    /// A pipeline validation error occurred.
    #[error("{0}")]
    Validation(#[from] PipelineValidationError),

    /// A template could not be resolved.
    #[error("{0}")]
    Template(#[from] TemplateError),

    /// An artifact could not be registered or read.
    #[error("{0}")]
    Artifact(#[from] ArtifactError),

    /// A resolved value was written twice.
    #[error("{0}")]
    DataConflict(#[from] DataConflictError),

    /// The configuration is invalid.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// A fatal error stopped the run.
    #[error("{0}")]
    Fatal(#[from] FatalAbort),

    /// Non-fatal reasons gathered from one or more stage groups.
    #[error("{0}")]
    Aggregated(#[from] AggregatedError),

    /// The run was cancelled from outside.
    #[error("Release cancelled: {0}")]
    Cancelled(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error raised when a pipeline definition is invalid.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct PipelineValidationError {
    /// The error message.
    pub message: String,
    /// The stages or groups involved in the error.
    pub stages: Vec<String>,
}

impl PipelineValidationError {
    /// Creates a new pipeline validation error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stages: Vec::new(),
        }
    }

    /// Sets the stages involved.
    #[must_use]
    pub fn with_stages(mut self, stages: Vec<String>) -> Self {
        self.stages = stages;
        self
    }
}

/// Errors produced while resolving a template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// A `.Field` reference did not resolve.
    #[error("template: unknown field '{0}'")]
    UnknownField(String),

    /// A function name is not defined.
    #[error("template: unknown function '{0}'")]
    UnknownFunction(String),

    /// The template text is malformed.
    #[error("template: syntax error at offset {offset}: {message}")]
    Syntax {
        /// Byte offset in the template where the problem was found.
        offset: usize,
        /// What is wrong.
        message: String,
    },

    /// A function was called with the wrong number of arguments.
    #[error("template: function '{function}' expects {expected} argument(s), got {got}")]
    Arity {
        /// The function name.
        function: String,
        /// The accepted argument count, e.g. `"2"` or `"at least 1"`.
        expected: String,
        /// The number of arguments supplied.
        got: usize,
    },

    /// A function received a value it cannot work with.
    #[error("template: {function}: {message}")]
    Type {
        /// The function name.
        function: String,
        /// What is wrong.
        message: String,
    },
}

impl TemplateError {
    /// Creates a syntax error.
    #[must_use]
    pub fn syntax(offset: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            offset,
            message: message.into(),
        }
    }

    /// Creates an arity error.
    #[must_use]
    pub fn arity(function: impl Into<String>, expected: impl Into<String>, got: usize) -> Self {
        Self::Arity {
            function: function.into(),
            expected: expected.into(),
            got,
        }
    }

    /// Creates a type error.
    #[must_use]
    pub fn type_error(function: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Type {
            function: function.into(),
            message: message.into(),
        }
    }
}

/// Errors raised by the artifact store.
#[derive(Debug, Error)]
pub enum ArtifactError {
    /// An artifact with the same id already exists for the same platform.
    #[error("duplicate artifact '{id}' for platform '{platform}'")]
    Duplicate {
        /// The colliding identifier.
        id: String,
        /// The platform, in display form.
        platform: String,
    },

    /// The artifact file could not be read.
    #[error("artifact '{name}': {source}")]
    Io {
        /// The artifact name.
        name: String,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
}

impl ArtifactError {
    /// Creates a duplicate error.
    #[must_use]
    pub fn duplicate(id: impl Into<String>, platform: impl Into<String>) -> Self {
        Self::Duplicate {
            id: id.into(),
            platform: platform.into(),
        }
    }
}

/// Error raised when writing to an existing key in the resolved values.
#[derive(Debug, Clone, Error)]
#[error("Data conflict: key '{key}' already exists")]
pub struct DataConflictError {
    /// The conflicting key.
    pub key: String,
}

impl DataConflictError {
    /// Creates a new data conflict error.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

/// Errors in the release configuration.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// An `env` entry is not of the form `KEY=VALUE`.
    #[error("invalid env entry '{0}': expected KEY=VALUE")]
    InvalidEnv(String),

    /// A version string could not be parsed.
    #[error("invalid version '{value}': {message}")]
    InvalidVersion {
        /// The raw input.
        value: String,
        /// The parser message.
        message: String,
    },
}

/// A fatal error that stopped the run before every group executed.
#[derive(Debug, Clone, Error, Serialize)]
#[error("release aborted in group '{group}': {reason}")]
pub struct FatalAbort {
    /// The group in which the run stopped.
    pub group: String,
    /// The stage responsible, when a single stage is.
    pub stage: Option<String>,
    /// The reason, as it is reported to the user.
    pub reason: String,
}

impl FatalAbort {
    /// Creates a new fatal abort.
    #[must_use]
    pub fn new(group: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            stage: None,
            reason: reason.into(),
        }
    }

    /// Sets the responsible stage.
    #[must_use]
    pub fn with_stage(mut self, stage: impl Into<String>) -> Self {
        self.stage = Some(stage.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_validation_error() {
        let err = PipelineValidationError::new("Duplicate stage 'docker'")
            .with_stages(vec!["docker".to_string()]);

        assert_eq!(err.to_string(), "Duplicate stage 'docker'");
        assert_eq!(err.stages, vec!["docker".to_string()]);
    }

    #[test]
    fn test_template_error_names_symbol() {
        let err = TemplateError::UnknownField("Nope".to_string());
        assert!(err.to_string().contains("Nope"));

        let err = TemplateError::UnknownFunction("frobnicate".to_string());
        assert!(err.to_string().contains("frobnicate"));
    }

    #[test]
    fn test_arity_error_message() {
        let err = TemplateError::arity("replace", "3", 1);
        assert_eq!(
            err.to_string(),
            "template: function 'replace' expects 3 argument(s), got 1"
        );
    }

    #[test]
    fn test_duplicate_artifact_error() {
        let err = ArtifactError::duplicate("app", "linux_amd64");
        assert_eq!(
            err.to_string(),
            "duplicate artifact 'app' for platform 'linux_amd64'"
        );
    }

    #[test]
    fn test_fatal_abort_display() {
        let err = FatalAbort::new("package", "docker: build failed").with_stage("docker");
        assert_eq!(
            err.to_string(),
            "release aborted in group 'package': docker: build failed"
        );
        assert_eq!(err.stage.as_deref(), Some("docker"));
    }

    #[test]
    fn test_top_level_conversion() {
        let err: ReleaseflowError = DataConflictError::new("ReleaseURL").into();
        assert!(matches!(err, ReleaseflowError::DataConflict(_)));
        assert!(err.to_string().contains("ReleaseURL"));
    }
}
