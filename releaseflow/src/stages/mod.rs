//! The stage contract and built-in stages.
//!
//! A stage is one downstream step of a release: an image builder, an announcer,
//! a publisher. The orchestrator drives every stage through the same hooks:
//!
//! 1. [`apply_defaults`](Stage::apply_defaults) once, before anything else in its group
//! 2. [`skip`](Stage::skip) to decide whether it participates
//! 3. [`run`](Stage::run), the only hook allowed to touch the outside world

pub mod checksum;
pub mod files;
#[cfg(feature = "webhook")]
pub mod webhook;

use crate::context::ReleaseContext;
use crate::core::StageError;
use async_trait::async_trait;
use std::fmt::Debug;

/// Trait for release stages.
#[async_trait]
pub trait Stage: Send + Sync + Debug {
    /// Returns the name of the stage, used in logs and reasons.
    fn name(&self) -> &str;

    /// Decides whether the stage sits this run out.
    ///
    /// An `Err` is a failure, never a skip.
    fn skip(&self, _ctx: &ReleaseContext) -> Result<bool, StageError> {
        Ok(false)
    }

    /// The reason recorded when [`skip`](Self::skip) returns `true`.
    fn skip_reason(&self) -> String {
        format!("{} skipped", self.name())
    }

    /// Fills unset configuration with defaults. Runs once per run, before `skip`.
    fn apply_defaults(&mut self, _ctx: &ReleaseContext) -> Result<(), StageError> {
        Ok(())
    }

    /// Executes the stage.
    ///
    /// Returning `Err(StageError::Skip(_))` is a late skip and is only valid
    /// before any side effect happened.
    async fn run(&self, ctx: &ReleaseContext) -> Result<(), StageError>;
}

/// A simple function-based stage.
pub struct FnStage<F>
where
    F: Fn(&ReleaseContext) -> Result<(), StageError> + Send + Sync,
{
    name: String,
    func: F,
}

impl<F> FnStage<F>
where
    F: Fn(&ReleaseContext) -> Result<(), StageError> + Send + Sync,
{
    /// Creates a new function-based stage.
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> Debug for FnStage<F>
where
    F: Fn(&ReleaseContext) -> Result<(), StageError> + Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnStage").field("name", &self.name).finish()
    }
}

#[async_trait]
impl<F> Stage for FnStage<F>
where
    F: Fn(&ReleaseContext) -> Result<(), StageError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, ctx: &ReleaseContext) -> Result<(), StageError> {
        (self.func)(ctx)
    }
}

/// A stage that does nothing.
#[derive(Debug, Clone)]
pub struct NoOpStage {
    name: String,
}

impl NoOpStage {
    /// Creates a new no-op stage.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl Stage for NoOpStage {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, _ctx: &ReleaseContext) -> Result<(), StageError> {
        Ok(())
    }
}
