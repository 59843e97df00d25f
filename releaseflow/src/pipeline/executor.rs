//! Group-by-group execution of a release pipeline.

use super::{
    ExecutionMode, FailurePolicy, GroupReport, RunReport, RunStatus, StageGroup, StageRecord,
};
use crate::context::ReleaseContext;
use crate::core::{OutcomeAggregator, StageError, StageOutcome, StagePhase, StageStatus};
use crate::errors::FatalAbort;
use crate::observability::{SpanTimer, StageSpanAttributes};
use crate::stages::Stage;
use futures::stream::{self, StreamExt};
use futures::FutureExt;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{debug, error, info, info_span, warn, Instrument};

/// A validated release pipeline, built with [`PipelineBuilder`](super::PipelineBuilder).
#[derive(Debug)]
pub struct ReleasePipeline {
    name: String,
    groups: Vec<StageGroup>,
}

/// How far a stage got in `run`.
enum Attempt {
    Finished(Result<(), StageError>),
    Cancelled,
    NotStarted,
}

struct GroupRun {
    report: GroupReport,
    fatal: Option<FatalAbort>,
    cancelled_run: bool,
}

impl ReleasePipeline {
    pub(crate) fn new(name: String, groups: Vec<StageGroup>) -> Self {
        Self { name, groups }
    }

    /// Returns the pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the group names in order.
    #[must_use]
    pub fn group_names(&self) -> Vec<&str> {
        self.groups.iter().map(StageGroup::name).collect()
    }

    /// Returns the total number of stages.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.groups.iter().map(StageGroup::len).sum()
    }

    /// Runs every group in order against the context.
    ///
    /// Never returns early with an error: every outcome, including an abort,
    /// is described by the returned [`RunReport`].
    pub async fn run(&mut self, ctx: &ReleaseContext) -> RunReport {
        let span = info_span!("release", pipeline = %self.name, run_id = %ctx.identity());
        self.run_groups(ctx).instrument(span).await
    }

    async fn run_groups(&mut self, ctx: &ReleaseContext) -> RunReport {
        let timer = SpanTimer::start(self.name.clone());
        info!(groups = self.groups.len(), stages = self.stage_count(), "release started");
        ctx.emit(
            "pipeline.started",
            Some(serde_json::json!({
                "pipeline": self.name,
                "groups": self.group_names(),
            })),
        );

        let mut groups = Vec::with_capacity(self.groups.len());
        let mut fatal = None;
        let mut cancelled = None;
        let mut warned = false;

        for group in &mut self.groups {
            if ctx.is_cancelled() {
                let reason = cancel_reason(ctx);
                fatal = Some(FatalAbort::new(&group.name, format!("cancelled: {reason}")));
                cancelled = Some(reason);
                break;
            }

            let run = run_group(group, ctx).await;
            warned |= run.report.error.is_some();
            groups.push(run.report);

            if ctx.is_cancelled() && !run.cancelled_run {
                let reason = cancel_reason(ctx);
                fatal = Some(
                    run.fatal
                        .unwrap_or_else(|| FatalAbort::new(&group.name, format!("cancelled: {reason}"))),
                );
                cancelled = Some(reason);
                break;
            }
            if run.fatal.is_some() {
                fatal = run.fatal;
                break;
            }
        }

        let status = if fatal.is_some() {
            RunStatus::Aborted
        } else if warned {
            RunStatus::CompletedWithWarnings
        } else {
            RunStatus::Completed
        };

        let report = RunReport {
            pipeline: self.name.clone(),
            run_id: ctx.identity().run_id,
            status,
            duration_ms: timer.finish(),
            groups,
            fatal,
            cancelled,
        };

        let summary = serde_json::json!({
            "pipeline": report.pipeline,
            "status": report.status,
            "duration_ms": report.duration_ms,
            "warnings": report.warnings(),
        });
        match &report.fatal {
            Some(fatal) => {
                error!(%fatal, "release aborted");
                ctx.emit("pipeline.aborted", Some(summary));
            }
            None => {
                info!(status = %report.status, duration_ms = report.duration_ms, "release finished");
                ctx.emit("pipeline.completed", Some(summary));
            }
        }
        report
    }
}

async fn run_group(group: &mut StageGroup, ctx: &ReleaseContext) -> GroupRun {
    let span = info_span!("group", name = %group.name, mode = %group.mode, policy = %group.policy);
    run_group_inner(group, ctx).instrument(span).await
}

async fn run_group_inner(group: &mut StageGroup, ctx: &ReleaseContext) -> GroupRun {
    ctx.emit(
        "group.started",
        Some(serde_json::json!({
            "group": group.name,
            "mode": group.mode.to_string(),
            "stages": group.stage_names(),
        })),
    );

    // Defaults: sequential, fail-fast, always fatal.
    for stage in &mut group.stages {
        if let Err(err) = guarded(|| stage.apply_defaults(ctx)) {
            let name = stage.name().to_string();
            let outcome = StageOutcome::failed(&name, StagePhase::Defaults, err);
            let record = record(&group.name, &name, &outcome, 0.0, ctx);

            let mut agg = OutcomeAggregator::new();
            agg.remember(&outcome);
            let reason = outcome.reason().unwrap_or_default();
            return GroupRun {
                report: GroupReport {
                    name: group.name.clone(),
                    stages: vec![record],
                    error: agg.evaluate().err(),
                },
                fatal: Some(FatalAbort::new(&group.name, reason).with_stage(name)),
                cancelled_run: false,
            };
        }
    }

    let group = &*group;
    let count = group.stages.len();
    let mut slots: Vec<Option<(StageOutcome, f64)>> = (0..count).map(|_| None).collect();
    let mut pending = Vec::with_capacity(count);
    let mut skip_failed = false;

    for (i, stage) in group.stages.iter().enumerate() {
        match guarded(|| stage.skip(ctx)) {
            Ok(true) => slots[i] = Some((StageOutcome::skipped(stage.skip_reason()), 0.0)),
            Ok(false) => pending.push(i),
            Err(err) => {
                skip_failed = true;
                slots[i] = Some((StageOutcome::failed(stage.name(), StagePhase::Skip, err), 0.0));
            }
        }
    }

    let mut cancelled_run = false;
    if skip_failed && group.policy == FailurePolicy::Abort {
        debug!("skip evaluation failed, no stage of the group runs");
    } else {
        match group.mode {
            ExecutionMode::Sequential => {
                for &i in &pending {
                    let stage = group.stages[i].as_ref();
                    let (attempt, ms) = run_stage(stage, &group.name, ctx).await;
                    let Some(outcome) = settle(stage.name(), attempt, ctx) else {
                        break;
                    };
                    let stop = outcome.is_failure() && group.policy == FailurePolicy::Abort;
                    slots[i] = Some((outcome, ms));
                    if stop {
                        break;
                    }
                }
            }
            ExecutionMode::Concurrent { max_parallelism } => {
                let stages = &group.stages;
                let name = group.name.as_str();
                let mut running = stream::iter(pending.iter().copied())
                    .map(move |i| async move {
                        let (attempt, ms) = run_stage(stages[i].as_ref(), name, ctx).await;
                        (i, attempt, ms)
                    })
                    .buffer_unordered(max_parallelism.max(1));

                while let Some((i, attempt, ms)) = running.next().await {
                    let Some(outcome) = settle(stages[i].name(), attempt, ctx) else {
                        continue;
                    };
                    if outcome.is_failure()
                        && group.policy == FailurePolicy::Abort
                        && !ctx.is_cancelled()
                    {
                        ctx.cancel(format!(
                            "group '{}' aborted: {}",
                            group.name,
                            outcome.reason().unwrap_or_default()
                        ));
                        cancelled_run = true;
                    }
                    slots[i] = Some((outcome, ms));
                }
            }
        }
    }

    let mut agg = OutcomeAggregator::new();
    let mut records = Vec::with_capacity(count);
    let mut first_failed = None;
    for (stage, slot) in group.stages.iter().zip(&slots) {
        let Some((outcome, ms)) = slot else { continue };
        agg.remember(outcome);
        if outcome.is_failure() && first_failed.is_none() {
            first_failed = Some(stage.name().to_string());
        }
        records.push(record(&group.name, stage.name(), outcome, *ms, ctx));
    }

    let error = agg.evaluate().err();
    let fatal = match (&error, first_failed) {
        (Some(err), Some(stage)) if group.policy == FailurePolicy::Abort => {
            Some(FatalAbort::new(&group.name, err.to_string()).with_stage(stage))
        }
        _ => None,
    };

    match (&error, &fatal) {
        (_, Some(_)) => {}
        (Some(err), None) => warn!(reasons = %err, "group finished with warnings"),
        (None, None) => debug!("group finished"),
    }
    ctx.emit(
        "group.completed",
        Some(serde_json::json!({
            "group": group.name,
            "error": error.as_ref().map(ToString::to_string),
            "fatal": fatal.is_some(),
        })),
    );

    GroupRun {
        report: GroupReport {
            name: group.name.clone(),
            stages: records,
            error,
        },
        fatal,
        cancelled_run,
    }
}

/// Runs one stage unless the run is cancelled before or during `run`.
async fn run_stage(stage: &dyn Stage, group: &str, ctx: &ReleaseContext) -> (Attempt, f64) {
    if ctx.is_cancelled() {
        return (Attempt::NotStarted, 0.0);
    }

    let timer = SpanTimer::start(stage.name());
    ctx.emit(
        "stage.started",
        Some(StageSpanAttributes::new(stage.name(), group).to_payload()),
    );
    let span = info_span!("stage", name = %stage.name(), group = %group);
    let work = AssertUnwindSafe(stage.run(ctx)).catch_unwind();
    let outcome = match ctx
        .cancellation()
        .run_until_cancelled(work)
        .instrument(span)
        .await
    {
        Some(Ok(result)) => Attempt::Finished(result),
        Some(Err(panic)) => Attempt::Finished(Err(panicked(panic.as_ref()))),
        None => Attempt::Cancelled,
    };
    (outcome, timer.finish())
}

/// Runs a synchronous hook, turning a panic into a failure.
fn guarded<T>(hook: impl FnOnce() -> Result<T, StageError>) -> Result<T, StageError> {
    catch_unwind(AssertUnwindSafe(hook)).unwrap_or_else(|panic| Err(panicked(panic.as_ref())))
}

fn panicked(payload: &(dyn Any + Send)) -> StageError {
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown payload".to_string());
    StageError::msg(format!("panicked: {message}"))
}

fn settle(stage: &str, attempt: Attempt, ctx: &ReleaseContext) -> Option<StageOutcome> {
    match attempt {
        Attempt::Finished(result) => Some(StageOutcome::from_result(stage, StagePhase::Run, result)),
        Attempt::Cancelled => Some(StageOutcome::failed(
            stage,
            StagePhase::Run,
            StageError::msg(format!("cancelled: {}", cancel_reason(ctx))),
        )),
        Attempt::NotStarted => None,
    }
}

fn record(
    group: &str,
    stage: &str,
    outcome: &StageOutcome,
    duration_ms: f64,
    ctx: &ReleaseContext,
) -> StageRecord {
    let status = outcome.status();
    let phase = match outcome {
        StageOutcome::Failed(failure) => Some(failure.phase),
        _ => None,
    };
    let reason = outcome.reason();

    let mut attrs = StageSpanAttributes::new(stage, group)
        .with_status(status)
        .with_duration_ms(duration_ms);
    if let Some(phase) = phase {
        attrs = attrs.with_phase(phase);
    }
    if let Some(reason) = &reason {
        attrs = attrs.with_reason(reason.clone());
    }

    match status {
        StageStatus::Ok => {
            info!(stage, duration_ms, "stage completed");
            ctx.emit("stage.completed", Some(attrs.to_payload()));
        }
        StageStatus::Skip => {
            info!(stage, reason = reason.as_deref().unwrap_or_default(), "stage skipped");
            ctx.emit("stage.skipped", Some(attrs.to_payload()));
        }
        StageStatus::Fail => {
            error!(stage, reason = reason.as_deref().unwrap_or_default(), "stage failed");
            ctx.emit("stage.failed", Some(attrs.to_payload()));
        }
    }

    StageRecord {
        stage: stage.to_string(),
        status,
        phase,
        reason,
        duration_ms,
    }
}

fn cancel_reason(ctx: &ReleaseContext) -> String {
    ctx.cancellation()
        .reason()
        .unwrap_or("cancelled")
        .to_string()
}
