//! Mock stages for testing.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::artifact::Artifact;
use crate::context::ReleaseContext;
use crate::core::{StageError, StagePhase};
use crate::stages::Stage;

/// An ordered journal of hook calls shared between stages.
///
/// Entries read `"<hook>:<stage>"`, e.g. `"run:docker"`.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl CallLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry.
    pub fn push(&self, entry: impl Into<String>) {
        self.entries.lock().push(entry.into());
    }

    /// Returns all entries in call order.
    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }

    /// Returns true if the entry was logged.
    #[must_use]
    pub fn contains(&self, entry: &str) -> bool {
        self.entries.lock().iter().any(|e| e == entry)
    }

    /// Returns the index of the first matching entry.
    #[must_use]
    pub fn position(&self, entry: &str) -> Option<usize> {
        self.entries.lock().iter().position(|e| e == entry)
    }

    /// Returns the entries for one hook, stage names only.
    #[must_use]
    pub fn calls(&self, hook: &str) -> Vec<String> {
        let prefix = format!("{hook}:");
        self.entries
            .lock()
            .iter()
            .filter_map(|e| e.strip_prefix(&prefix).map(ToString::to_string))
            .collect()
    }
}

/// A stage that records every hook call and otherwise succeeds.
#[derive(Debug)]
pub struct RecordingStage {
    name: String,
    log: CallLog,
    skip: bool,
}

impl RecordingStage {
    /// Creates a recording stage writing to `log`.
    #[must_use]
    pub fn new(name: impl Into<String>, log: &CallLog) -> Self {
        Self {
            name: name.into(),
            log: log.clone(),
            skip: false,
        }
    }

    /// Makes [`Stage::skip`] return `true`.
    #[must_use]
    pub fn skipping(mut self) -> Self {
        self.skip = true;
        self
    }
}

#[async_trait]
impl Stage for RecordingStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn skip(&self, _ctx: &ReleaseContext) -> Result<bool, StageError> {
        self.log.push(format!("skip:{}", self.name));
        Ok(self.skip)
    }

    fn apply_defaults(&mut self, _ctx: &ReleaseContext) -> Result<(), StageError> {
        self.log.push(format!("defaults:{}", self.name));
        Ok(())
    }

    async fn run(&self, _ctx: &ReleaseContext) -> Result<(), StageError> {
        self.log.push(format!("run:{}", self.name));
        Ok(())
    }
}

/// A stage that fails in one hook.
#[derive(Debug)]
pub struct FailingStage {
    name: String,
    message: String,
    phase: StagePhase,
    delay: Duration,
    log: CallLog,
}

impl FailingStage {
    /// Creates a stage whose `run` fails with `message`.
    #[must_use]
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            phase: StagePhase::Run,
            delay: Duration::ZERO,
            log: CallLog::new(),
        }
    }

    /// Sleeps `ms` milliseconds in `run` before failing.
    #[must_use]
    pub fn with_delay_ms(mut self, ms: u64) -> Self {
        self.delay = Duration::from_millis(ms);
        self
    }

    /// Fails in `phase` instead of `run`.
    #[must_use]
    pub fn in_phase(mut self, phase: StagePhase) -> Self {
        self.phase = phase;
        self
    }

    /// Records hook calls into `log`.
    #[must_use]
    pub fn with_log(mut self, log: &CallLog) -> Self {
        self.log = log.clone();
        self
    }

    fn hook(&self, phase: StagePhase) -> Result<(), StageError> {
        self.log.push(format!("{phase}:{}", self.name));
        if phase == self.phase {
            return Err(StageError::msg(self.message.clone()));
        }
        Ok(())
    }
}

#[async_trait]
impl Stage for FailingStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn skip(&self, _ctx: &ReleaseContext) -> Result<bool, StageError> {
        self.hook(StagePhase::Skip).map(|()| false)
    }

    fn apply_defaults(&mut self, _ctx: &ReleaseContext) -> Result<(), StageError> {
        self.hook(StagePhase::Defaults)
    }

    async fn run(&self, _ctx: &ReleaseContext) -> Result<(), StageError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.hook(StagePhase::Run)
    }
}

/// A stage that decides to skip only once it runs (a late skip).
#[derive(Debug)]
pub struct SkippingStage {
    name: String,
    reason: String,
}

impl SkippingStage {
    /// Creates a stage whose `run` returns a skip with `reason`.
    #[must_use]
    pub fn new(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl Stage for SkippingStage {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, _ctx: &ReleaseContext) -> Result<(), StageError> {
        Err(StageError::skip(self.reason.clone()))
    }
}

/// Tracks how many stages are inside `run` at once.
#[derive(Debug, Clone, Default)]
pub struct ConcurrencyProbe {
    current: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl ConcurrencyProbe {
    /// Creates a probe.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a stage as running until the guard drops.
    #[must_use]
    pub fn enter(&self) -> ProbeGuard {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        ProbeGuard {
            current: Arc::clone(&self.current),
        }
    }

    /// Returns the highest number of stages seen running at once.
    #[must_use]
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Returns the number of stages running now.
    #[must_use]
    pub fn current(&self) -> usize {
        self.current.load(Ordering::SeqCst)
    }
}

/// Guard returned by [`ConcurrencyProbe::enter`].
#[derive(Debug)]
pub struct ProbeGuard {
    current: Arc<AtomicUsize>,
}

impl Drop for ProbeGuard {
    fn drop(&mut self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A stage that takes time to run.
#[derive(Debug)]
pub struct SlowStage {
    name: String,
    delay: Duration,
    probe: Option<ConcurrencyProbe>,
    log: CallLog,
}

impl SlowStage {
    /// Creates a new slow stage.
    #[must_use]
    pub fn new(name: impl Into<String>, delay: Duration) -> Self {
        Self {
            name: name.into(),
            delay,
            probe: None,
            log: CallLog::new(),
        }
    }

    /// Creates a slow stage with delay in milliseconds.
    #[must_use]
    pub fn with_delay_ms(name: impl Into<String>, ms: u64) -> Self {
        Self::new(name, Duration::from_millis(ms))
    }

    /// Reports into a concurrency probe.
    #[must_use]
    pub fn with_probe(mut self, probe: &ConcurrencyProbe) -> Self {
        self.probe = Some(probe.clone());
        self
    }

    /// Logs `run:<name>` on start and `done:<name>` on completion.
    #[must_use]
    pub fn with_log(mut self, log: &CallLog) -> Self {
        self.log = log.clone();
        self
    }
}

#[async_trait]
impl Stage for SlowStage {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, _ctx: &ReleaseContext) -> Result<(), StageError> {
        let _guard = self.probe.as_ref().map(ConcurrencyProbe::enter);
        self.log.push(format!("run:{}", self.name));
        tokio::time::sleep(self.delay).await;
        self.log.push(format!("done:{}", self.name));
        Ok(())
    }
}

/// A stage that registers an artifact when it runs.
#[derive(Debug)]
pub struct ArtifactStage {
    name: String,
    artifact: Artifact,
}

impl ArtifactStage {
    /// Creates a stage registering `artifact`.
    #[must_use]
    pub fn new(name: impl Into<String>, artifact: Artifact) -> Self {
        Self {
            name: name.into(),
            artifact,
        }
    }
}

#[async_trait]
impl Stage for ArtifactStage {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, ctx: &ReleaseContext) -> Result<(), StageError> {
        ctx.artifacts().register(self.artifact.clone())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::ArtifactKind;
    use crate::testing::TestContext;

    #[tokio::test]
    async fn test_recording_stage() {
        let log = CallLog::new();
        let mut stage = RecordingStage::new("docker", &log);
        let ctx = TestContext::new().build();

        stage.apply_defaults(&ctx).unwrap();
        assert!(!stage.skip(&ctx).unwrap());
        stage.run(&ctx).await.unwrap();

        assert_eq!(log.entries(), vec!["defaults:docker", "skip:docker", "run:docker"]);
        assert_eq!(log.calls("run"), vec!["docker"]);
        assert_eq!(log.position("run:docker"), Some(2));
    }

    #[tokio::test]
    async fn test_failing_stage_phases() {
        let ctx = TestContext::new().build();

        let stage = FailingStage::new("a", "boom");
        assert_eq!(stage.run(&ctx).await.unwrap_err().to_string(), "boom");

        let stage = FailingStage::new("b", "bad").in_phase(StagePhase::Skip);
        assert!(stage.skip(&ctx).is_err());
        assert!(stage.run(&ctx).await.is_ok());

        let mut stage = FailingStage::new("c", "bad").in_phase(StagePhase::Defaults);
        assert!(stage.apply_defaults(&ctx).is_err());
    }

    #[tokio::test]
    async fn test_skipping_stage_is_a_late_skip() {
        let ctx = TestContext::new().build();
        let err = SkippingStage::new("snap", "no snapcraft").run(&ctx).await.unwrap_err();
        assert!(err.is_skip());
        assert_eq!(err.skip_reason(), Some("no snapcraft"));
    }

    #[tokio::test]
    async fn test_slow_stage_probe() {
        let probe = ConcurrencyProbe::new();
        let stage = SlowStage::with_delay_ms("slow", 10).with_probe(&probe);
        let ctx = TestContext::new().build();

        let start = std::time::Instant::now();
        stage.run(&ctx).await.unwrap();

        assert!(start.elapsed() >= Duration::from_millis(10));
        assert_eq!(probe.peak(), 1);
        assert_eq!(probe.current(), 0);
    }

    #[tokio::test]
    async fn test_artifact_stage_registers() {
        let ctx = TestContext::new().build();
        let stage = ArtifactStage::new(
            "build",
            Artifact::new("app", "app", "dist/app", ArtifactKind::Binary),
        );
        stage.run(&ctx).await.unwrap();
        assert_eq!(ctx.artifacts().len(), 1);
    }
}
