//! Pipeline builder with validation.

use super::{ExecutionMode, ReleasePipeline, StageGroup};
use crate::errors::PipelineValidationError;
use std::collections::HashSet;

/// Builder for creating validated release pipelines.
///
/// Each group is checked as it is added; [`build`](Self::build) checks the
/// pipeline as a whole.
#[derive(Debug)]
pub struct PipelineBuilder {
    name: String,
    groups: Vec<StageGroup>,
    group_names: HashSet<String>,
    stage_names: HashSet<String>,
}

impl PipelineBuilder {
    /// Creates a new pipeline builder.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            groups: Vec::new(),
            group_names: HashSet::new(),
            stage_names: HashSet::new(),
        }
    }

    /// Appends a group.
    ///
    /// # Errors
    ///
    /// Returns an error for an unnamed or empty group, a duplicate group or
    /// stage name, or a concurrent group with `max_parallelism` of zero.
    pub fn group(mut self, group: StageGroup) -> Result<Self, PipelineValidationError> {
        if group.name.trim().is_empty() {
            return Err(PipelineValidationError::new("Group name cannot be empty"));
        }
        if self.group_names.contains(&group.name) {
            return Err(PipelineValidationError::new(format!(
                "Duplicate group '{}'",
                group.name
            ))
            .with_stages(vec![group.name.clone()]));
        }
        if group.is_empty() {
            return Err(PipelineValidationError::new(format!(
                "Group '{}' has no stages",
                group.name
            ))
            .with_stages(vec![group.name.clone()]));
        }
        if let ExecutionMode::Concurrent { max_parallelism: 0 } = group.mode {
            return Err(PipelineValidationError::new(format!(
                "Group '{}' must allow at least one stage at a time",
                group.name
            ))
            .with_stages(vec![group.name.clone()]));
        }

        let mut added = HashSet::new();
        for name in group.stage_names() {
            if name.trim().is_empty() {
                return Err(PipelineValidationError::new(format!(
                    "Group '{}' has a stage with an empty name",
                    group.name
                ))
                .with_stages(vec![group.name.clone()]));
            }
            if self.stage_names.contains(name) || !added.insert(name.to_string()) {
                return Err(
                    PipelineValidationError::new(format!("Duplicate stage '{name}'"))
                        .with_stages(vec![name.to_string()]),
                );
            }
        }

        self.stage_names.extend(added);
        self.group_names.insert(group.name.clone());
        self.groups.push(group);
        Ok(self)
    }

    /// Builds the pipeline.
    ///
    /// # Errors
    ///
    /// Returns an error if no group was added.
    pub fn build(self) -> Result<ReleasePipeline, PipelineValidationError> {
        if self.groups.is_empty() {
            return Err(PipelineValidationError::new(format!(
                "Pipeline '{}' has no stage groups",
                self.name
            )));
        }
        Ok(ReleasePipeline::new(self.name, self.groups))
    }
}
