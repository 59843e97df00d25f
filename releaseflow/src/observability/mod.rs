//! Observability utilities.
//!
//! The engine itself only emits `tracing` spans and events; installing a
//! subscriber is left to the embedding binary through [`init_logging`].

mod logging;
mod spans;

pub use logging::{init_logging, LogFormat};
pub use spans::{SpanTimer, StageSpanAttributes};
