//! Make the release root absolute and make sure it exists.

use crate::error::Result;
use crate::pipeline::{BoxFuture, PRECONDITION_FAILED, PipelineStep, SUCCESS};
use crate::release::ReleaseContext;
use futures_util::FutureExt;
use path_absolutize::Absolutize;
use std::path::PathBuf;

/// Resolves a relative root against a fallback base directory
#[derive(Debug, Clone)]
pub struct AssertRootStep {
    fallback_root: PathBuf,
}

impl AssertRootStep {
    /// Anchor relative roots under `fallback_root`
    pub fn new(fallback_root: impl Into<PathBuf>) -> Self {
        Self {
            fallback_root: fallback_root.into(),
        }
    }
}

impl PipelineStep<ReleaseContext> for AssertRootStep {
    fn name(&self) -> &str {
        "assert-root"
    }

    fn run<'a>(&'a self, ctx: &'a mut ReleaseContext) -> BoxFuture<'a, Result<i32>> {
        async move {
            let resolved = ctx.root.absolutize_from(&self.fallback_root)?.into_owned();
            if resolved != ctx.root {
                log::debug!(
                    "Resolved release root {} to {}",
                    ctx.root.display(),
                    resolved.display()
                );
            }

            if !tokio::fs::metadata(&resolved)
                .await
                .map(|m| m.is_dir())
                .unwrap_or(false)
            {
                log::error!("Release root not found: {}", resolved.display());
                return Ok(PRECONDITION_FAILED);
            }

            ctx.root = resolved;
            log::info!("Release root: {}", ctx.root.display());
            Ok(SUCCESS)
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_relative_root_is_anchored_under_fallback() {
        let base = TempDir::new().expect("tempdir");
        std::fs::create_dir(base.path().join("Acme")).expect("mkdir");

        let mut ctx = ReleaseContext::new("Acme", "key", false);
        let code = AssertRootStep::new(base.path())
            .run(&mut ctx)
            .await
            .expect("no fault");

        assert_eq!(code, SUCCESS);
        assert_eq!(ctx.root, base.path().join("Acme"));
    }

    #[tokio::test]
    async fn test_absolute_root_is_kept() {
        let root = TempDir::new().expect("tempdir");
        let mut ctx = ReleaseContext::new(root.path(), "key", false);

        let code = AssertRootStep::new("/nonexistent-fallback")
            .run(&mut ctx)
            .await
            .expect("no fault");

        assert_eq!(code, SUCCESS);
        assert_eq!(ctx.root, root.path());
    }

    #[tokio::test]
    async fn test_missing_root_is_precondition_failure() {
        let base = TempDir::new().expect("tempdir");
        let mut ctx = ReleaseContext::new("Missing", "key", false);

        let code = AssertRootStep::new(base.path())
            .run(&mut ctx)
            .await
            .expect("no fault");

        assert_eq!(code, PRECONDITION_FAILED);
    }
}
