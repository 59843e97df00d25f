//! Staging of extra files next to a stage's output.

use crate::config::ExtraFile;
use crate::context::ReleaseContext;
use crate::core::StageError;
use crate::template::TemplateResolver;
use anyhow::Context as _;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Copies each extra file into `dest_dir` and returns the written paths in order.
///
/// Destinations are templates and default to the source file name. Files marked
/// `templated` have their contents resolved with the same resolver. Only call
/// this from [`Stage::run`](crate::stages::Stage::run).
pub async fn prepare_extra_files(
    ctx: &ReleaseContext,
    files: &[ExtraFile],
    dest_dir: &Path,
) -> Result<Vec<PathBuf>, StageError> {
    let resolver = TemplateResolver::new(ctx);
    let mut written = Vec::with_capacity(files.len());

    for file in files {
        let destination = if file.destination.trim().is_empty() {
            file.source
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .ok_or_else(|| {
                    StageError::msg(format!("extra file '{}' has no file name", file.source.display()))
                })?
        } else {
            resolver.apply(&file.destination)?
        };
        let target = dest_dir.join(destination);

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("creating {}", parent.display()))?;
        }

        if file.templated {
            let contents = tokio::fs::read_to_string(&file.source)
                .await
                .with_context(|| format!("reading {}", file.source.display()))?;
            tokio::fs::write(&target, resolver.apply(&contents)?)
                .await
                .with_context(|| format!("writing {}", target.display()))?;
        } else {
            tokio::fs::copy(&file.source, &target)
                .await
                .with_context(|| format!("copying {} to {}", file.source.display(), target.display()))?;
        }

        #[cfg(unix)]
        if let Some(mode) = file.mode {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&target, std::fs::Permissions::from_mode(mode))
                .await
                .with_context(|| format!("setting mode on {}", target.display()))?;
        }

        debug!(source = %file.source.display(), target = %target.display(), "extra file staged");
        written.push(target);
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::TemplateError;
    use crate::testing::TestContext;

    #[tokio::test]
    async fn test_copy_and_template_extra_files() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        std::fs::write(src.path().join("LICENSE"), "MIT {{ .Tag }}").unwrap();
        std::fs::write(src.path().join("notes.tpl"), "Release {{ .Tag }}").unwrap();

        let files = vec![
            ExtraFile::new(src.path().join("LICENSE")),
            ExtraFile::new(src.path().join("notes.tpl"))
                .with_destination("docs/{{ .ProjectName }}.txt")
                .templated(),
        ];

        let ctx = TestContext::new().build();
        let written = prepare_extra_files(&ctx, &files, out.path()).await.unwrap();

        assert_eq!(written[0], out.path().join("LICENSE"));
        assert_eq!(std::fs::read_to_string(&written[0]).unwrap(), "MIT {{ .Tag }}");
        assert_eq!(written[1], out.path().join("docs/demo.txt"));
        assert_eq!(std::fs::read_to_string(&written[1]).unwrap(), "Release v1.2.3");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_mode_is_applied() {
        use std::os::unix::fs::PermissionsExt;

        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        std::fs::write(src.path().join("run.sh"), "#!/bin/sh").unwrap();

        let files = vec![ExtraFile::new(src.path().join("run.sh")).with_mode(0o755)];
        let ctx = TestContext::new().build();
        let written = prepare_extra_files(&ctx, &files, out.path()).await.unwrap();

        let mode = std::fs::metadata(&written[0]).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    #[tokio::test]
    async fn test_bad_destination_template() {
        let out = tempfile::tempdir().unwrap();
        let files = vec![ExtraFile::new("LICENSE").with_destination("{{ .Missing }}")];
        let ctx = TestContext::new().build();

        let err = prepare_extra_files(&ctx, &files, out.path()).await.unwrap_err();
        assert!(matches!(
            err,
            StageError::Template(TemplateError::UnknownField(ref f)) if f == "Missing"
        ));
    }
}
