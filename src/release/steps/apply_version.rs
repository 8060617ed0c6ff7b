//! Resolve every project file, then back up and patch them in parallel.

use crate::error::{ReleaseError, Result};
use crate::pipeline::{BoxFuture, PRECONDITION_FAILED, ParallelRunner, PipelineStep, SUCCESS};
use crate::release::ReleaseContext;
use crate::version::{patch_project_file, project_file_path};
use futures_util::FutureExt;
use std::sync::Arc;

/// Writes each candidate's version into its project file
#[derive(Debug, Clone)]
pub struct ApplyVersionStep {
    runner: ParallelRunner,
}

impl ApplyVersionStep {
    /// Fan out through `runner`
    pub fn new(runner: ParallelRunner) -> Self {
        Self { runner }
    }
}

impl PipelineStep<ReleaseContext> for ApplyVersionStep {
    fn name(&self) -> &str {
        "apply-version"
    }

    fn run<'a>(&'a self, ctx: &'a mut ReleaseContext) -> BoxFuture<'a, Result<i32>> {
        async move {
            let root: Arc<std::path::Path> = ctx.root.as_path().into();
            let names: Vec<String> = ctx.candidates.iter().map(|c| c.name().to_string()).collect();

            // Nothing is written unless every project file exists
            let resolved = self
                .runner
                .run(names, move |name: String| {
                    let path = project_file_path(&root, &name);
                    async move {
                        let exists = tokio::fs::try_exists(&path).await.unwrap_or(false);
                        Ok((name, exists.then_some(path)))
                    }
                })
                .await?;

            let mut missing = 0;
            for (name, path) in resolved {
                match (path, ctx.candidates.iter_mut().find(|c| c.has_name(&name))) {
                    (Some(path), Some(candidate)) => candidate.set_project_file(path),
                    (None, _) => {
                        log::error!(
                            "Project file not found for {name}: {}",
                            project_file_path(&ctx.root, &name).display()
                        );
                        missing += 1;
                    }
                    (Some(_), None) => {}
                }
            }
            if missing > 0 {
                return Ok(PRECONDITION_FAILED);
            }

            self.runner
                .run(ctx.candidates.to_vec(), |candidate| async move {
                    patch_project_file(&candidate).await?;
                    log::info!("Applied {candidate}");
                    Ok::<(), ReleaseError>(())
                })
                .await?;

            Ok(SUCCESS)
        }
        .boxed()
    }
}
