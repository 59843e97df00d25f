//! Test fixtures for release runs.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};

use crate::config::ReleaseConfig;
use crate::context::{Env, ReleaseContext, Version};
use crate::events::EventSink;

/// A deterministic [`ReleaseContext`] builder.
///
/// Defaults: project `demo`, version `v1.2.3` tagged `v1.2.3`, commit
/// `abcdef1234567890abcdef`, build date `2024-01-02T03:04:05Z`, not a
/// snapshot, and an environment holding only `FOO=bar`. The process
/// environment is never read.
#[derive(Clone)]
pub struct TestContext {
    /// Release configuration.
    pub config: ReleaseConfig,
    /// Version.
    pub version: Version,
    /// Tag.
    pub tag: String,
    /// Previous tag.
    pub previous_tag: String,
    /// Commit hash.
    pub commit: String,
    /// Build date.
    pub date: DateTime<Utc>,
    /// Snapshot flag.
    pub snapshot: bool,
    /// Base environment.
    pub env: Env,
    /// Event sink, if one should be attached.
    pub sink: Option<Arc<dyn EventSink>>,
}

impl TestContext {
    /// Creates a builder with the default fixture values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: ReleaseConfig::new("demo"),
            version: Version {
                raw: "v1.2.3".to_string(),
                major: 1,
                minor: 2,
                patch: 3,
                prerelease: String::new(),
            },
            tag: "v1.2.3".to_string(),
            previous_tag: "v1.2.2".to_string(),
            commit: "abcdef1234567890abcdef".to_string(),
            date: Utc
                .with_ymd_and_hms(2024, 1, 2, 3, 4, 5)
                .single()
                .unwrap_or_default(),
            snapshot: false,
            env: Env::new().with_var("FOO", "bar"),
            sink: None,
        }
    }

    /// Marks the run as a snapshot.
    #[must_use]
    pub fn snapshot(mut self) -> Self {
        self.snapshot = true;
        self
    }

    /// Sets the project name.
    #[must_use]
    pub fn with_project(mut self, name: impl Into<String>) -> Self {
        self.config.project_name = name.into();
        self
    }

    /// Sets the output directory.
    #[must_use]
    pub fn with_dist(mut self, dist: impl Into<PathBuf>) -> Self {
        self.config.dist = dist.into();
        self
    }

    /// Sets the version and the tag.
    #[must_use]
    pub fn with_version(mut self, version: Version) -> Self {
        self.tag.clone_from(&version.raw);
        self.version = version;
        self
    }

    /// Adds an environment variable.
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env = self.env.with_var(key, value);
        self
    }

    /// Attaches an event sink.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Builds the context.
    ///
    /// # Panics
    ///
    /// Panics if `config.env` holds a malformed override.
    #[must_use]
    pub fn build(&self) -> ReleaseContext {
        let ctx = ReleaseContext::new(self.config.clone())
            .unwrap_or_else(|err| panic!("invalid test context: {err}"))
            .with_env(self.env.clone())
            .with_version(self.version.clone())
            .with_tag(self.tag.clone())
            .with_previous_tag(self.previous_tag.clone())
            .with_commit(self.commit.clone())
            .with_date(self.date)
            .with_snapshot(self.snapshot);

        match &self.sink {
            Some(sink) => ctx.with_event_sink(Arc::clone(sink)),
            None => ctx,
        }
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestContext")
            .field("project", &self.config.project_name)
            .field("tag", &self.tag)
            .field("snapshot", &self.snapshot)
            .field("sink", &self.sink.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::CollectingEventSink;

    #[test]
    fn test_default_fixture() {
        let ctx = TestContext::new().build();

        assert_eq!(ctx.project_name(), "demo");
        assert_eq!(ctx.version().to_string(), "1.2.3");
        assert_eq!(ctx.tag(), "v1.2.3");
        assert_eq!(ctx.previous_tag(), "v1.2.2");
        assert_eq!(ctx.short_commit(), "abcdef1");
        assert_eq!(ctx.date().timestamp(), 1_704_164_645);
        assert!(!ctx.is_snapshot());
        assert_eq!(ctx.env().get("FOO"), Some("bar"));
        assert_eq!(ctx.env().len(), 1);
    }

    #[test]
    fn test_builder_overrides() {
        let sink = Arc::new(CollectingEventSink::new());
        let ctx = TestContext::new()
            .snapshot()
            .with_project("other")
            .with_dist("/tmp/out")
            .with_env("TOKEN", "x")
            .with_sink(sink.clone())
            .build();

        assert!(ctx.is_snapshot());
        assert_eq!(ctx.project_name(), "other");
        assert_eq!(ctx.config().dist, PathBuf::from("/tmp/out"));
        assert_eq!(ctx.env().get("TOKEN"), Some("x"));

        ctx.emit("custom", None);
        assert_eq!(sink.event_types(), vec!["custom"]);
    }

    #[test]
    fn test_with_version_sets_tag() {
        let ctx = TestContext::new()
            .with_version(Version::parse("v2.0.0-rc.1").unwrap())
            .build();
        assert_eq!(ctx.tag(), "v2.0.0-rc.1");
        assert_eq!(ctx.version().prerelease, "rc.1");
    }
}
