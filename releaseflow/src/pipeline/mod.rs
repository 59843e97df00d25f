//! Pipeline building and execution.
//!
//! This module provides:
//! - Stage groups with a sequential or bounded-concurrent mode
//! - Pipeline builder with validation
//! - The group-by-group executor and its failure policies
//! - Run reports

mod builder;
mod executor;
mod group;
mod report;


pub use builder::PipelineBuilder;
pub use executor::ReleasePipeline;
pub use group::{ExecutionMode, FailurePolicy, StageGroup};
pub use report::{GroupReport, RunReport, RunStatus, StageRecord};
