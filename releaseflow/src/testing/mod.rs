//! Testing utilities for release pipelines.
//!
//! This module provides:
//! - A deterministic release context builder
//! - Mock stages and a shared call log
//! - Assertions on run reports

mod assertions;
mod fixtures;
mod mocks;

pub use assertions::{
    assert_run_status, assert_stage_not_run, assert_stage_skipped, assert_stage_status,
    assert_warning,
};
pub use fixtures::TestContext;
pub use mocks::{
    ArtifactStage, CallLog, ConcurrencyProbe, FailingStage, ProbeGuard, RecordingStage,
    SkippingStage, SlowStage,
};
