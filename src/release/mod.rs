//! Release orchestration: context, candidate resolution, steps and cleanup.
//!
//! [`build_release_pipeline`] assembles the steps in their fixed order:
//!
//! 1. `assert-root`: absolute, existing root
//! 2. `init-for-release`: clean tree, stale package output removed, manifest loaded
//! 3. `init-versions`: already-published candidates dropped
//! 4. `apply-version`: project files backed up and patched
//! 5. `run-tests` (skippable)
//! 6. `pack`
//! 7. `push`
//!
//! The [`RestoreProjectFiles`] finalizer runs after all of them whatever
//! happened, so a failed release never leaves patched versions behind.

mod context;
mod finalizer;
pub mod resolver;
pub mod steps;

pub use context::{CandidateSet, ReleaseCandidate, ReleaseContext};
pub use finalizer::RestoreProjectFiles;

use crate::config::ReleaseConfig;
use crate::git::WorkingTreeGate;
use crate::pipeline::{ParallelRunner, Pipeline};
use crate::publish::PackageTool;
use crate::registry::RegistryClient;
use crate::retry::RetryPolicy;
use std::sync::Arc;
use steps::{
    ApplyVersionStep, AssertRootStep, InitForReleaseStep, InitVersionsStep, PackStep, PushStep,
    RunTestsStep,
};

/// External collaborators the steps delegate to
#[derive(Debug)]
pub struct ReleaseServices<R, G, T> {
    /// Registry lookups
    pub registry: Arc<R>,
    /// Working tree status
    pub gate: Arc<G>,
    /// Test, pack and push
    pub tools: Arc<T>,
}

/// Assemble the release pipeline with its finalizer
pub fn build_release_pipeline<R, G, T>(
    services: ReleaseServices<R, G, T>,
    config: &ReleaseConfig,
) -> Pipeline<ReleaseContext>
where
    R: RegistryClient,
    G: WorkingTreeGate,
    T: PackageTool,
{
    let runner = ParallelRunner::bounded(config.max_parallel);
    let retry = RetryPolicy::with_retries(config.registry_retries);

    Pipeline::new("release")
        .add_step(AssertRootStep::new(config.fallback_root.clone()))
        .add_step(InitForReleaseStep::new(services.gate))
        .add_step(InitVersionsStep::new(services.registry, runner.clone(), retry))
        .add_step(ApplyVersionStep::new(runner.clone()))
        .add_step(RunTestsStep::new(Arc::clone(&services.tools), runner.clone()))
        .add_step(PackStep::new(Arc::clone(&services.tools), runner.clone()))
        .add_step(PushStep::new(
            services.tools,
            runner.clone(),
            config.push_source.clone(),
        ))
        .with_finalizer(RestoreProjectFiles::new(runner))
}
