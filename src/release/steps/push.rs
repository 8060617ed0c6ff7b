//! Publish each candidate's package and classify the registry's answer.

use super::files_with_extension;
use crate::config::PUBLIC_NUGET_SOURCE;
use crate::error::{ProjectError, ReleaseError, Result};
use crate::pipeline::{BoxFuture, ParallelRunner, PipelineStep, sum_codes};
use crate::publish::{PackageTool, PushOutcome};
use crate::release::ReleaseContext;
use crate::version::pack_dir_for;
use futures_util::FutureExt;
use std::sync::Arc;

/// Package artifact extension; symbol packages (`.snupkg`) never match
pub const PACKAGE_EXTENSION: &str = "nupkg";

/// Pushes every candidate; conflicts count against the run without faulting it
#[derive(Debug)]
pub struct PushStep<T> {
    tools: Arc<T>,
    runner: ParallelRunner,
    push_source: Option<String>,
}

impl<T: PackageTool> PushStep<T> {
    /// Push with `tools`; `push_source` overrides the manifest's first source
    pub fn new(tools: Arc<T>, runner: ParallelRunner, push_source: Option<String>) -> Self {
        Self {
            tools,
            runner,
            push_source,
        }
    }
}

impl<T: PackageTool> PipelineStep<ReleaseContext> for PushStep<T> {
    fn name(&self) -> &str {
        "push"
    }

    fn run<'a>(&'a self, ctx: &'a mut ReleaseContext) -> BoxFuture<'a, Result<i32>> {
        async move {
            let source: Arc<str> = self
                .push_source
                .as_deref()
                .or(ctx.sources.first().map(String::as_str))
                .unwrap_or(PUBLIC_NUGET_SOURCE)
                .into();
            let api_key: Arc<str> = ctx.api_key.as_str().into();
            let tools = Arc::clone(&self.tools);

            let codes = self
                .runner
                .run(ctx.candidates.to_vec(), move |candidate| {
                    let tools = Arc::clone(&tools);
                    let source = Arc::clone(&source);
                    let api_key = Arc::clone(&api_key);
                    async move {
                        let pack_dir = pack_dir_for(candidate.require_project_file()?);
                        let mut artifacts = files_with_extension(&pack_dir, PACKAGE_EXTENSION)?;
                        if artifacts.len() != 1 {
                            return Err(ReleaseError::Project(ProjectError::ArtifactCount {
                                dir: pack_dir,
                                found: artifacts.len(),
                            }));
                        }
                        let package = artifacts.remove(0);

                        let output = tools.push(&package, &api_key, &source).await?;
                        let outcome = PushOutcome::classify(&output.text());
                        match outcome {
                            PushOutcome::Conflict => {
                                log::warn!("Conflict detected for {candidate}. See log for details.");
                            }
                            PushOutcome::Pushed => {
                                output.ensure_success()?;
                                log::info!("✓ {candidate} successfully released to {source}");
                            }
                            PushOutcome::Unrecognized => {
                                output.ensure_success()?;
                                log::warn!("Error detected for {candidate}. See log for details.");
                            }
                        }
                        Ok(outcome.code())
                    }
                })
                .await?;

            Ok(sum_codes(&codes))
        }
        .boxed()
    }
}
