//! Drop candidates the registry already has at the declared version.

use crate::error::Result;
use crate::pipeline::{BoxFuture, PRECONDITION_FAILED, ParallelRunner, PipelineStep, SUCCESS};
use crate::registry::RegistryClient;
use crate::release::ReleaseContext;
use crate::release::resolver::{fetch_published, remove_published};
use crate::retry::RetryPolicy;
use futures_util::FutureExt;
use std::sync::Arc;

/// Resolves the candidate set against the registry
#[derive(Debug)]
pub struct InitVersionsStep<R> {
    registry: Arc<R>,
    runner: ParallelRunner,
    retry: RetryPolicy,
}

impl<R: RegistryClient> InitVersionsStep<R> {
    /// Query `registry` through `runner`, retrying lookups per `retry`
    pub fn new(registry: Arc<R>, runner: ParallelRunner, retry: RetryPolicy) -> Self {
        Self {
            registry,
            runner,
            retry,
        }
    }
}

impl<R: RegistryClient> PipelineStep<ReleaseContext> for InitVersionsStep<R> {
    fn name(&self) -> &str {
        "init-versions"
    }

    fn run<'a>(&'a self, ctx: &'a mut ReleaseContext) -> BoxFuture<'a, Result<i32>> {
        async move {
            log::debug!("Resolving release candidates:\n{}", ctx.summary());

            let published = fetch_published(
                &self.registry,
                &self.runner,
                self.retry,
                &ctx.candidates,
                &ctx.sources,
            )
            .await?;

            for candidate in remove_published(&mut ctx.candidates, &published) {
                log::warn!("{candidate} already exists. Ignoring in release.");
            }

            if ctx.candidates.is_empty() {
                log::error!("No release candidates. Aborting release");
                return Ok(PRECONDITION_FAILED);
            }

            for candidate in ctx.candidates.iter() {
                let latest = published
                    .get(candidate.name())
                    .map(|info| info.version_or_sentinel().to_string())
                    .unwrap_or_else(|| crate::registry::NEVER_PUBLISHED.to_string());
                log::info!("{candidate} approved for release (registry has {latest})");
            }
            Ok(SUCCESS)
        }
        .boxed()
    }
}
