//! Build one package per candidate into a fresh output directory.

use crate::error::{ReleaseError, Result};
use crate::pipeline::{BoxFuture, ParallelRunner, PipelineStep, SUCCESS, sum_codes};
use crate::publish::PackageTool;
use crate::release::ReleaseContext;
use crate::version::pack_dir_for;
use futures_util::FutureExt;
use std::sync::Arc;

/// Packs every candidate; a failed pack faults the run
#[derive(Debug)]
pub struct PackStep<T> {
    tools: Arc<T>,
    runner: ParallelRunner,
}

impl<T: PackageTool> PackStep<T> {
    /// Pack with `tools`, fanned out through `runner`
    pub fn new(tools: Arc<T>, runner: ParallelRunner) -> Self {
        Self { tools, runner }
    }
}

impl<T: PackageTool> PipelineStep<ReleaseContext> for PackStep<T> {
    fn name(&self) -> &str {
        "pack"
    }

    fn run<'a>(&'a self, ctx: &'a mut ReleaseContext) -> BoxFuture<'a, Result<i32>> {
        async move {
            let tools = Arc::clone(&self.tools);
            let codes = self
                .runner
                .run(ctx.candidates.to_vec(), move |candidate| {
                    let tools = Arc::clone(&tools);
                    async move {
                        let project = candidate.require_project_file()?;
                        let pack_dir = pack_dir_for(project);

                        if tokio::fs::try_exists(&pack_dir).await.unwrap_or(false) {
                            tokio::fs::remove_dir_all(&pack_dir).await?;
                        }
                        tokio::fs::create_dir_all(&pack_dir).await?;

                        tools.pack(project, &pack_dir).await?.ensure_success()?;
                        log::info!("Packed {candidate} into {}", pack_dir.display());
                        Ok::<i32, ReleaseError>(SUCCESS)
                    }
                })
                .await?;

            Ok(sum_codes(&codes))
        }
        .boxed()
    }
}
