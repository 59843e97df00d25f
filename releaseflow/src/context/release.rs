//! The release context shared by every stage.

use super::{ContextValues, Env, RunIdentity, Version};
use crate::artifact::ArtifactStore;
use crate::cancellation::CancellationToken;
use crate::config::ReleaseConfig;
use crate::errors::ConfigError;
use crate::events::{EventSink, NoOpEventSink};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Shared state for one release run.
///
/// Built once before the run and handed to every stage by reference. After
/// construction it is only appended to: artifacts go to [`artifacts`](Self::artifacts)
/// and resolved values go to [`values`](Self::values).
pub struct ReleaseContext {
    identity: RunIdentity,
    config: ReleaseConfig,
    version: Version,
    tag: String,
    previous_tag: String,
    commit: String,
    date: DateTime<Utc>,
    snapshot: bool,
    env: Env,
    env_overrides: Vec<(String, String)>,
    artifacts: ArtifactStore,
    values: ContextValues,
    cancellation: CancellationToken,
    event_sink: Arc<dyn EventSink>,
}

impl ReleaseContext {
    /// Creates a context from configuration.
    ///
    /// The environment is a snapshot of the process environment with the
    /// configured `KEY=VALUE` overrides applied on top.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnv` for a malformed override.
    pub fn new(config: ReleaseConfig) -> Result<Self, ConfigError> {
        let env_overrides = Env::parse_overrides(&config.env)?;
        let env = Env::from_process().merged(&env_overrides);
        let artifacts = ArtifactStore::with_policy(config.duplicate_policy);

        Ok(Self {
            identity: RunIdentity::new(),
            config,
            version: Version::default(),
            tag: String::new(),
            previous_tag: String::new(),
            commit: String::new(),
            date: Utc::now(),
            snapshot: false,
            env,
            env_overrides,
            artifacts,
            values: ContextValues::new(),
            cancellation: CancellationToken::new(),
            event_sink: Arc::new(NoOpEventSink),
        })
    }

    /// Replaces the base environment. Configured overrides still apply on top.
    #[must_use]
    pub fn with_env(mut self, base: Env) -> Self {
        self.env = base.merged(&self.env_overrides);
        self
    }

    /// Sets the version.
    #[must_use]
    pub fn with_version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    /// Sets the tag.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    /// Sets the previous tag.
    #[must_use]
    pub fn with_previous_tag(mut self, tag: impl Into<String>) -> Self {
        self.previous_tag = tag.into();
        self
    }

    /// Sets the full commit hash.
    #[must_use]
    pub fn with_commit(mut self, commit: impl Into<String>) -> Self {
        self.commit = commit.into();
        self
    }

    /// Sets the build date.
    #[must_use]
    pub fn with_date(mut self, date: DateTime<Utc>) -> Self {
        self.date = date;
        self
    }

    /// Marks the run as a snapshot.
    #[must_use]
    pub fn with_snapshot(mut self, snapshot: bool) -> Self {
        self.snapshot = snapshot;
        self
    }

    /// Sets the run identity.
    #[must_use]
    pub fn with_identity(mut self, identity: RunIdentity) -> Self {
        self.identity = identity;
        self
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = sink;
        self
    }

    /// Returns the run identity.
    #[must_use]
    pub fn identity(&self) -> RunIdentity {
        self.identity
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &ReleaseConfig {
        &self.config
    }

    /// Returns the project name.
    #[must_use]
    pub fn project_name(&self) -> &str {
        &self.config.project_name
    }

    /// Returns the version.
    #[must_use]
    pub fn version(&self) -> &Version {
        &self.version
    }

    /// Returns the tag.
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Returns the previous tag.
    #[must_use]
    pub fn previous_tag(&self) -> &str {
        &self.previous_tag
    }

    /// Returns the full commit hash.
    #[must_use]
    pub fn commit(&self) -> &str {
        &self.commit
    }

    /// Returns the first 7 characters of the commit hash.
    #[must_use]
    pub fn short_commit(&self) -> &str {
        match self.commit.char_indices().nth(7) {
            Some((idx, _)) => &self.commit[..idx],
            None => &self.commit,
        }
    }

    /// Returns the build date.
    #[must_use]
    pub fn date(&self) -> DateTime<Utc> {
        self.date
    }

    /// Returns true for a snapshot run.
    #[must_use]
    pub fn is_snapshot(&self) -> bool {
        self.snapshot
    }

    /// Returns the environment snapshot.
    #[must_use]
    pub fn env(&self) -> &Env {
        &self.env
    }

    /// Returns the artifact store.
    #[must_use]
    pub fn artifacts(&self) -> &ArtifactStore {
        &self.artifacts
    }

    /// Returns the resolved values.
    #[must_use]
    pub fn values(&self) -> &ContextValues {
        &self.values
    }

    /// Returns the cancellation token.
    #[must_use]
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Requests cancellation of the run.
    pub fn cancel(&self, reason: impl Into<String>) {
        self.cancellation.cancel(reason);
    }

    /// Returns whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Emits an event, enriched with the run ID.
    pub fn emit(&self, event_type: &str, data: Option<serde_json::Value>) {
        let mut enriched = data.unwrap_or_else(|| serde_json::json!({}));

        if let serde_json::Value::Object(ref mut map) = enriched {
            map.insert(
                "run_id".to_string(),
                serde_json::json!(self.identity.run_id.to_string()),
            );
            if !self.config.project_name.is_empty() {
                map.insert(
                    "project".to_string(),
                    serde_json::json!(self.config.project_name),
                );
            }
        }

        self.event_sink.try_emit(event_type, Some(enriched));
    }
}

impl std::fmt::Debug for ReleaseContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReleaseContext")
            .field("run_id", &self.identity.run_id)
            .field("project_name", &self.config.project_name)
            .field("version", &self.version.to_string())
            .field("tag", &self.tag)
            .field("artifacts", &self.artifacts.len())
            .field("cancelled", &self.is_cancelled())
            .finish_non_exhaustive()
    }
}
