//! Configuration types for releases and stages.
//!
//! These are plain serde structs. Loading them from disk is the embedding
//! binary's job; releaseflow only consumes them.

use crate::artifact::{DuplicatePolicy, PlatformFilter, Selection};
use crate::context::ReleaseContext;
use crate::errors::TemplateError;
use crate::template::TemplateResolver;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Release-wide configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseConfig {
    /// Project name, exposed to templates as `.ProjectName`.
    #[serde(default)]
    pub project_name: String,
    /// Output directory for generated files.
    #[serde(default = "default_dist")]
    pub dist: PathBuf,
    /// `KEY=VALUE` overrides layered over the process environment.
    #[serde(default)]
    pub env: Vec<String>,
    /// Defaults for HTTP-style stages.
    #[serde(default)]
    pub http: HttpDefaults,
    /// Duplicate policy for the artifact store.
    #[serde(default)]
    pub duplicate_policy: DuplicatePolicy,
}

fn default_dist() -> PathBuf {
    PathBuf::from("dist")
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        Self {
            project_name: String::new(),
            dist: default_dist(),
            env: Vec::new(),
            http: HttpDefaults::default(),
            duplicate_policy: DuplicatePolicy::default(),
        }
    }
}

impl ReleaseConfig {
    /// Creates a configuration for a project.
    #[must_use]
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            project_name: project_name.into(),
            ..Self::default()
        }
    }

    /// Sets the output directory.
    #[must_use]
    pub fn with_dist(mut self, dist: impl Into<PathBuf>) -> Self {
        self.dist = dist.into();
        self
    }

    /// Adds a `KEY=VALUE` environment override.
    #[must_use]
    pub fn with_env(mut self, entry: impl Into<String>) -> Self {
        self.env.push(entry.into());
        self
    }

    /// Sets the duplicate policy.
    #[must_use]
    pub fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }
}

/// Defaults shared by HTTP-style stages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpDefaults {
    /// Status codes that count as success.
    #[serde(default = "default_expected_status_codes")]
    pub expected_status_codes: Vec<u16>,
    /// Request content type.
    #[serde(default = "default_content_type")]
    pub content_type: String,
    /// User agent string.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

fn default_expected_status_codes() -> Vec<u16> {
    vec![200, 201, 202, 204]
}

fn default_content_type() -> String {
    "application/json; charset=utf-8".to_string()
}

fn default_user_agent() -> String {
    "releaseflow".to_string()
}

fn default_timeout() -> u64 {
    30
}

impl Default for HttpDefaults {
    fn default() -> Self {
        Self {
            expected_status_codes: default_expected_status_codes(),
            content_type: default_content_type(),
            user_agent: default_user_agent(),
            timeout_seconds: default_timeout(),
        }
    }
}

impl HttpDefaults {
    /// Gets the timeout as a `Duration`.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// A file copied next to a stage's output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtraFile {
    /// Source path.
    pub source: PathBuf,
    /// Destination path relative to the stage's working directory; templated.
    /// Defaults to the source file name.
    #[serde(default)]
    pub destination: String,
    /// Unix file mode.
    #[serde(default)]
    pub mode: Option<u32>,
    /// Whether the file contents are a template.
    #[serde(default)]
    pub templated: bool,
}

impl ExtraFile {
    /// Creates an extra file copied verbatim.
    #[must_use]
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            destination: String::new(),
            mode: None,
            templated: false,
        }
    }

    /// Sets the destination.
    #[must_use]
    pub fn with_destination(mut self, destination: impl Into<String>) -> Self {
        self.destination = destination.into();
        self
    }

    /// Sets the file mode.
    #[must_use]
    pub fn with_mode(mut self, mode: u32) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Marks the contents as templated.
    #[must_use]
    pub fn templated(mut self) -> Self {
        self.templated = true;
        self
    }
}

/// Settings every stage shares.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageConfig {
    /// Stage identifier.
    #[serde(default)]
    pub id: String,
    /// Templated boolean; the stage is skipped when it resolves to `true`.
    #[serde(default)]
    pub skip: String,
    /// Artifact identifiers to act on; empty means all.
    #[serde(default)]
    pub ids: Vec<String>,
    /// Operating system filter.
    #[serde(default)]
    pub goos: Option<String>,
    /// Architecture filter.
    #[serde(default)]
    pub goarch: Option<String>,
    /// ARM variant filter.
    #[serde(default)]
    pub goarm: Option<String>,
    /// amd64 level filter.
    #[serde(default)]
    pub goamd64: Option<String>,
    /// Output name templates.
    #[serde(default)]
    pub name_templates: Vec<String>,
    /// Build-flag-like strings, resolved and passed through in order.
    #[serde(default)]
    pub flags: Vec<String>,
    /// Extra files to stage.
    #[serde(default)]
    pub extra_files: Vec<ExtraFile>,
}

impl StageConfig {
    /// Creates a stage configuration with an identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Sets the skip template.
    #[must_use]
    pub fn with_skip(mut self, skip: impl Into<String>) -> Self {
        self.skip = skip.into();
        self
    }

    /// Sets the artifact identifiers.
    #[must_use]
    pub fn with_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ids = ids.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the os and arch filters.
    #[must_use]
    pub fn with_platform(mut self, goos: impl Into<String>, goarch: impl Into<String>) -> Self {
        self.goos = Some(goos.into());
        self.goarch = Some(goarch.into());
        self
    }

    /// Adds a flag.
    #[must_use]
    pub fn with_flag(mut self, flag: impl Into<String>) -> Self {
        self.flags.push(flag.into());
        self
    }

    /// Builds the artifact selection from the id and platform filters.
    #[must_use]
    pub fn selection(&self) -> Selection {
        Selection::all()
            .with_ids(self.ids.iter().cloned())
            .with_platform(PlatformFilter {
                os: self.goos.clone(),
                arch: self.goarch.clone(),
                arm: self.goarm.clone(),
                amd64: self.goamd64.clone(),
            })
    }

    /// Resolves the skip template. An empty template never skips.
    pub fn should_skip(&self, ctx: &ReleaseContext) -> Result<bool, TemplateError> {
        if self.skip.trim().is_empty() {
            return Ok(false);
        }
        TemplateResolver::new(ctx).apply_bool(&self.skip)
    }

    /// Resolves the flags in order.
    pub fn resolved_flags(&self, ctx: &ReleaseContext) -> Result<Vec<String>, TemplateError> {
        TemplateResolver::new(ctx).apply_all(&self.flags)
    }
}
