//! Checksums file stage.

use crate::artifact::{Artifact, ArtifactKind, ChecksumAlgorithm};
use crate::config::StageConfig;
use crate::context::ReleaseContext;
use crate::core::StageError;
use crate::stages::Stage;
use crate::template::TemplateResolver;
use anyhow::Context as _;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Default name of the checksums file.
pub const DEFAULT_NAME_TEMPLATE: &str = "{{ .ProjectName }}_{{ .Version }}_checksums.txt";

/// Configuration for [`ChecksumStage`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecksumConfig {
    /// Shared stage settings; `ids` and platform filters pick the artifacts.
    #[serde(flatten)]
    pub stage: StageConfig,
    /// Output file name; templated.
    #[serde(default)]
    pub name_template: String,
    /// Hash algorithm.
    #[serde(default)]
    pub algorithm: ChecksumAlgorithm,
}

impl ChecksumConfig {
    /// Sets the hash algorithm.
    #[must_use]
    pub fn with_algorithm(mut self, algorithm: ChecksumAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Sets the output name template.
    #[must_use]
    pub fn with_name_template(mut self, template: impl Into<String>) -> Self {
        self.name_template = template.into();
        self
    }
}

/// Hashes the selected artifacts into one checksums file under `dist` and
/// registers that file as a [`ArtifactKind::Checksum`] artifact.
///
/// Each line is `<hex>  <artifact name>`, sorted by name.
#[derive(Debug, Clone)]
pub struct ChecksumStage {
    name: String,
    config: ChecksumConfig,
}

impl ChecksumStage {
    /// Creates a checksum stage.
    #[must_use]
    pub fn new(config: ChecksumConfig) -> Self {
        let name = if config.stage.id.is_empty() {
            "checksum".to_string()
        } else {
            config.stage.id.clone()
        };
        Self { name, config }
    }

    /// Returns the configuration, with defaults once they were applied.
    #[must_use]
    pub fn config(&self) -> &ChecksumConfig {
        &self.config
    }

    fn selected(&self, ctx: &ReleaseContext) -> Vec<std::sync::Arc<Artifact>> {
        let selection = self.config.stage.selection().with_kinds([
            ArtifactKind::Binary,
            ArtifactKind::PlatformPackage,
            ArtifactKind::Other,
        ]);
        ctx.artifacts().query(&selection)
    }
}

#[async_trait]
impl Stage for ChecksumStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn skip(&self, ctx: &ReleaseContext) -> Result<bool, StageError> {
        Ok(self.config.stage.should_skip(ctx)?)
    }

    fn apply_defaults(&mut self, _ctx: &ReleaseContext) -> Result<(), StageError> {
        if self.config.name_template.trim().is_empty() {
            self.config.name_template = DEFAULT_NAME_TEMPLATE.to_string();
        }
        Ok(())
    }

    async fn run(&self, ctx: &ReleaseContext) -> Result<(), StageError> {
        let artifacts = self.selected(ctx);
        if artifacts.is_empty() {
            return Err(StageError::skip("no artifacts to checksum"));
        }

        let algorithm = self.config.algorithm;
        let mut lines = Vec::with_capacity(artifacts.len());
        for artifact in &artifacts {
            let artifact = std::sync::Arc::clone(artifact);
            let sum = tokio::task::spawn_blocking(move || {
                artifact
                    .checksum(algorithm)
                    .map(|sum| format!("{sum}  {}", artifact.name))
            })
            .await
            .context("checksum task panicked")??;
            lines.push(sum);
        }
        lines.sort_by(|a, b| {
            let name = |l: &str| l.split_once("  ").map(|(_, n)| n.to_string());
            name(a).cmp(&name(b))
        });

        let filename = TemplateResolver::new(ctx).apply(&self.config.name_template)?;
        let dist = &ctx.config().dist;
        tokio::fs::create_dir_all(dist)
            .await
            .with_context(|| format!("creating {}", dist.display()))?;
        let path = dist.join(&filename);
        let mut contents = lines.join("\n");
        contents.push('\n');
        tokio::fs::write(&path, contents)
            .await
            .with_context(|| format!("writing {}", path.display()))?;

        ctx.artifacts().register(
            Artifact::new(self.name.clone(), filename.clone(), path, ArtifactKind::Checksum)
                .with_extra("algorithm", algorithm.to_string()),
        )?;
        info!(file = %filename, count = artifacts.len(), %algorithm, "checksums written");
        ctx.emit(
            "checksum.written",
            Some(serde_json::json!({ "file": filename, "count": artifacts.len() })),
        );
        Ok(())
    }
}
