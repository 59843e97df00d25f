//! Event sinks for run observability.
//!
//! The sink is injected into the [`ReleaseContext`](crate::context::ReleaseContext);
//! there is no global sink. The orchestrator emits `stage.*` and `group.*` events,
//! and stages may emit their own through [`ReleaseContext::emit`](crate::context::ReleaseContext::emit).

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
