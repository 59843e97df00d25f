//! Event sink trait and implementations.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, info, warn, Level};

/// Receives release events such as `stage.skipped` or `pipeline.aborted`.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Emits an event asynchronously.
    ///
    /// # Arguments
    ///
    /// * `event_type` - The type of event (e.g., "stage.skipped")
    /// * `data` - Optional event payload
    async fn emit(&self, event_type: &str, data: Option<Value>);

    /// Emits an event without awaiting.
    ///
    /// Must never panic; delivery errors are the sink's to swallow.
    fn try_emit(&self, event_type: &str, data: Option<Value>);
}

/// Discards every event. The default sink of a [`ReleaseContext`](crate::context::ReleaseContext).
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

#[async_trait]
impl EventSink for NoOpEventSink {
    async fn emit(&self, _event_type: &str, _data: Option<Value>) {}

    fn try_emit(&self, _event_type: &str, _data: Option<Value>) {}
}

/// Forwards events to `tracing`.
///
/// `*.failed` and `*.aborted` events are always logged at `WARN`; the rest at
/// the configured level (`DEBUG`, or `INFO` for anything else).
#[derive(Debug, Clone)]
pub struct LoggingEventSink {
    level: Level,
}

impl Default for LoggingEventSink {
    fn default() -> Self {
        Self { level: Level::INFO }
    }
}

impl LoggingEventSink {
    /// Creates a logging sink with the given level for routine events.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Creates a sink logging routine events at `DEBUG`.
    #[must_use]
    pub fn debug() -> Self {
        Self::new(Level::DEBUG)
    }

    fn log(&self, event_type: &str, data: Option<&Value>) {
        let field = |key: &str| {
            data.and_then(|d| d.get(key))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        let (run_id, group, stage) = (field("run_id"), field("group"), field("stage"));

        if is_problem(event_type) {
            warn!(event = event_type, %run_id, %group, %stage, data = ?data, "release event");
        } else if self.level == Level::DEBUG {
            debug!(event = event_type, %run_id, %group, %stage, data = ?data, "release event");
        } else {
            info!(event = event_type, %run_id, %group, %stage, "release event");
        }
    }
}

fn is_problem(event_type: &str) -> bool {
    event_type.ends_with(".failed") || event_type.ends_with(".aborted")
}

#[async_trait]
impl EventSink for LoggingEventSink {
    async fn emit(&self, event_type: &str, data: Option<Value>) {
        self.log(event_type, data.as_ref());
    }

    fn try_emit(&self, event_type: &str, data: Option<Value>) {
        self.log(event_type, data.as_ref());
    }
}

/// Keeps every event in memory, in emission order. Meant for tests.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: Mutex<Vec<(String, Option<Value>)>>,
}

impl CollectingEventSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected events.
    #[must_use]
    pub fn events(&self) -> Vec<(String, Option<Value>)> {
        self.events.lock().clone()
    }

    /// Returns the number of collected events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Returns true if nothing was emitted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Returns events whose type starts with `type_prefix`, e.g. `"stage."`.
    #[must_use]
    pub fn events_of_type(&self, type_prefix: &str) -> Vec<(String, Option<Value>)> {
        self.events
            .lock()
            .iter()
            .filter(|(t, _)| t.starts_with(type_prefix))
            .cloned()
            .collect()
    }

    /// Returns the payloads of events of exactly `event_type`.
    #[must_use]
    pub fn payloads(&self, event_type: &str) -> Vec<Value> {
        self.events
            .lock()
            .iter()
            .filter(|(t, _)| t == event_type)
            .filter_map(|(_, data)| data.clone())
            .collect()
    }

    /// Returns the event types in emission order.
    #[must_use]
    pub fn event_types(&self) -> Vec<String> {
        self.events.lock().iter().map(|(t, _)| t.clone()).collect()
    }

    /// Drops everything collected so far.
    pub fn clear(&self) {
        self.events.lock().clear();
    }

    fn push(&self, event_type: &str, data: Option<Value>) {
        self.events.lock().push((event_type.to_string(), data));
    }
}

#[async_trait]
impl EventSink for CollectingEventSink {
    async fn emit(&self, event_type: &str, data: Option<Value>) {
        self.push(event_type, data);
    }

    fn try_emit(&self, event_type: &str, data: Option<Value>) {
        self.push(event_type, data);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_noop_and_logging_sinks_accept_events() {
        NoOpEventSink.emit("pipeline.started", None).await;

        let sink = LoggingEventSink::debug();
        sink.emit("stage.skipped", Some(json!({"stage": "docker", "run_id": "r1"})))
            .await;
        sink.try_emit("stage.failed", Some(json!({"stage": "nfpm"})));
        LoggingEventSink::default().try_emit("group.completed", Some(json!("not an object")));
    }

    #[test]
    fn test_problem_events() {
        assert!(is_problem("stage.failed"));
        assert!(is_problem("pipeline.aborted"));
        assert!(!is_problem("stage.skipped"));
        assert!(!is_problem("failed.stage"));
    }

    #[tokio::test]
    async fn test_collecting_sink_filters() {
        let sink = CollectingEventSink::new();
        assert!(sink.is_empty());

        sink.emit("stage.started", Some(json!({"stage": "docker"}))).await;
        sink.try_emit("stage.skipped", Some(json!({"reason": "disabled"})));
        sink.try_emit("stage.skipped", None);
        sink.emit("group.completed", None).await;

        assert_eq!(sink.len(), 4);
        assert_eq!(sink.events_of_type("stage.").len(), 3);
        assert_eq!(sink.payloads("stage.skipped"), vec![json!({"reason": "disabled"})]);
        assert_eq!(
            sink.event_types(),
            vec!["stage.started", "stage.skipped", "stage.skipped", "group.completed"]
        );

        sink.clear();
        assert!(sink.is_empty());
    }
}
