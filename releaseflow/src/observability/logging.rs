//! Subscriber setup for binaries embedding releaseflow.

use serde::{Deserialize, Serialize};
use std::error::Error;
use tracing_subscriber::EnvFilter;

/// Output format for [`init_logging`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

/// Installs a global `tracing` subscriber.
///
/// The filter comes from `RUST_LOG` when set, otherwise from `default_directive`
/// (for example `"releaseflow=info"`).
///
/// # Errors
///
/// Fails if the directive is invalid or a global subscriber is already set.
pub fn init_logging(
    format: LogFormat,
    default_directive: &str,
) -> Result<(), Box<dyn Error + Send + Sync + 'static>> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_directive)?,
    };

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().with_current_span(true).try_init(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_serde() {
        let format: LogFormat = serde_json::from_str("\"json\"").unwrap();
        assert_eq!(format, LogFormat::Json);
        assert_eq!(LogFormat::default(), LogFormat::Text);
    }

    #[test]
    fn test_init_fails_once_a_subscriber_is_set() {
        // A bare registry writes nothing, so other tests stay quiet.
        let _ = tracing::subscriber::set_global_default(tracing_subscriber::registry());
        assert!(init_logging(LogFormat::Text, "releaseflow=debug").is_err());
        assert!(init_logging(LogFormat::Json, "releaseflow=debug").is_err());
    }
}
