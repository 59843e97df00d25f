//! # Releaseflow
//!
//! A release pipeline execution engine.
//!
//! Given a set of already-built artifacts, releaseflow runs an ordered list of
//! downstream stages (image builders, announcers, publishers) over one shared
//! [`ReleaseContext`](context::ReleaseContext):
//!
//! - **Stage contract**: every stage implements [`Stage`](stages::Stage) with
//!   optional `skip` / `apply_defaults` hooks and a required `run`
//! - **Skip protocol**: a stage that opts out is reported as skipped, never as failed
//! - **Aggregation**: reasons from sibling stages are collected, deduplicated and
//!   reported together instead of stopping at the first one
//! - **Artifact matching**: stages select artifacts by id, kind and target platform
//! - **Templates**: configuration strings resolve against the release context
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use releaseflow::prelude::*;
//!
//! let mut pipeline = PipelineBuilder::new("release")
//!     .group(StageGroup::sequential("package").with_stage(ChecksumStage::new(ChecksumConfig::default())))?
//!     .group(StageGroup::concurrent("announce", 4).with_stage(WebhookAnnouncer::new(webhook_config)))?
//!     .build()?;
//!
//! let report = pipeline.run(&ctx).await;
//! std::process::exit(report.exit_code(false));
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod artifact;
pub mod cancellation;
pub mod config;
pub mod context;
pub mod core;
pub mod errors;
pub mod events;
pub mod observability;
pub mod pipeline;
pub mod stages;
pub mod template;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::artifact::{
        Artifact, ArtifactKind, ArtifactStore, ChecksumAlgorithm, DuplicatePolicy, Platform,
        PlatformFilter, Selection,
    };
    pub use crate::cancellation::CancellationToken;
    pub use crate::config::{ExtraFile, HttpDefaults, ReleaseConfig, StageConfig};
    pub use crate::context::{ContextValues, Env, ReleaseContext, RunIdentity, Version};
    pub use crate::core::{
        is_skip, AggregatedError, OutcomeAggregator, SkipSignal, StageError, StageFailure,
        StageOutcome, StagePhase, StageStatus,
    };
    pub use crate::errors::{
        ArtifactError, ConfigError, DataConflictError, FatalAbort, PipelineValidationError,
        ReleaseflowError, TemplateError,
    };
    pub use crate::events::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::observability::{init_logging, LogFormat};
    pub use crate::pipeline::{
        ExecutionMode, FailurePolicy, GroupReport, PipelineBuilder, ReleasePipeline, RunReport,
        RunStatus, StageGroup, StageRecord,
    };
    pub use crate::stages::checksum::{ChecksumConfig, ChecksumStage};
    #[cfg(feature = "webhook")]
    pub use crate::stages::webhook::{WebhookAnnouncer, WebhookConfig};
    pub use crate::stages::{FnStage, NoOpStage, Stage};
    pub use crate::template::TemplateResolver;
}
