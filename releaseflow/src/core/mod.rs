//! Core domain model types for releaseflow.
//!
//! This module contains the fundamental types used throughout the engine:
//! - Stage status and phase enums
//! - The skip signal and the stage error taxonomy
//! - Stage outcomes and the deduplicating outcome aggregator

mod aggregator;
mod outcome;
mod skip;
mod status;

pub use aggregator::{AggregatedError, OutcomeAggregator};
pub use outcome::{StageFailure, StageOutcome};
pub use skip::{is_skip, SkipSignal, StageError};
pub use status::{StagePhase, StageStatus};
