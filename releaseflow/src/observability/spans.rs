//! Span timing and stage event payloads.

use crate::core::{StagePhase, StageStatus};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::trace;

/// Attributes attached to every stage event.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StageSpanAttributes {
    /// Stage name.
    pub stage: String,
    /// Group the stage belongs to.
    pub group: String,
    /// Final status, once known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<StageStatus>,
    /// Failing hook, for failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<StagePhase>,
    /// Duration in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<f64>,
    /// Skip or failure reason.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl StageSpanAttributes {
    /// Creates attributes for a stage in a group.
    #[must_use]
    pub fn new(stage: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            group: group.into(),
            ..Default::default()
        }
    }

    /// Sets the status.
    #[must_use]
    pub fn with_status(mut self, status: StageStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Sets the failing hook.
    #[must_use]
    pub fn with_phase(mut self, phase: StagePhase) -> Self {
        self.phase = Some(phase);
        self
    }

    /// Sets the duration.
    #[must_use]
    pub fn with_duration_ms(mut self, duration_ms: f64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    /// Sets the reason.
    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Converts to an event payload.
    #[must_use]
    pub fn to_payload(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|_| serde_json::json!({ "stage": self.stage }))
    }
}

/// Measures a pipeline, group or stage in milliseconds.
#[derive(Debug)]
pub struct SpanTimer {
    label: String,
    started: Instant,
}

impl SpanTimer {
    /// Starts timing `label`.
    #[must_use]
    pub fn start(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            started: Instant::now(),
        }
    }

    /// Returns what is being timed.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Milliseconds since the start, at microsecond precision.
    #[must_use]
    pub fn elapsed_ms(&self) -> f64 {
        let ms = self.started.elapsed().as_secs_f64() * 1000.0;
        (ms * 1000.0).round() / 1000.0
    }

    /// Stops the timer and returns the elapsed milliseconds.
    #[must_use]
    pub fn finish(self) -> f64 {
        let duration_ms = self.elapsed_ms();
        trace!(label = %self.label, duration_ms, "timer stopped");
        duration_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_payload_omits_unset_fields() {
        let payload = StageSpanAttributes::new("docker", "package")
            .with_status(StageStatus::Skip)
            .with_reason("docker skipped")
            .to_payload();

        assert_eq!(
            payload,
            serde_json::json!({
                "stage": "docker",
                "group": "package",
                "status": "skip",
                "reason": "docker skipped",
            })
        );
    }

    #[test]
    fn test_failure_payload() {
        let payload = StageSpanAttributes::new("webhook", "announce")
            .with_status(StageStatus::Fail)
            .with_phase(StagePhase::Run)
            .with_duration_ms(1.5)
            .to_payload();

        assert_eq!(payload["phase"], "run");
        assert_eq!(payload["duration_ms"], 1.5);
    }

    #[test]
    fn test_span_timer() {
        let timer = SpanTimer::start("checksum");
        assert_eq!(timer.label(), "checksum");
        std::thread::sleep(std::time::Duration::from_millis(10));

        let duration = timer.finish();
        assert!(duration >= 10.0);
        assert_eq!(duration, (duration * 1000.0).round() / 1000.0);
    }
}
