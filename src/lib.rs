//! # nuget_release
//!
//! Gated, self-restoring releases of .NET libraries to NuGet registries.
//!
//! A release run is a [`Pipeline`] of steps over a shared [`ReleaseContext`]:
//! the working tree must be clean, candidates already published at their
//! declared version are dropped, project files are patched, tested, packed
//! and pushed. Whatever happens, patched project files are restored from
//! their undo copies before the run returns.
//!
//! ## Features
//!
//! - **Exact-version gating**: only versions the registry does not have yet are released
//! - **Guaranteed cleanup**: the finalizer runs on success, abort, error and panic
//! - **Parallel fan-out**: per-candidate work runs concurrently, every unit is attempted
//! - **Typed collaborators**: registry, git and dotnet sit behind traits for testing
//!
//! ## Usage
//!
//! ```bash
//! nuget_release /src/acme --api-key "$KEY"   # release everything new
//! nuget_release acme --skip-tests -v         # ~/Projects/acme, skip tests, debug logging
//! ```
//!
//! Relative roots are anchored under the fallback root (`--fallback-root`,
//! default `~/Projects`), not the current directory.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod cli;
pub mod config;
pub mod error;
pub mod git;
pub mod manifest;
pub mod pipeline;
pub mod publish;
pub mod registry;
pub mod release;
pub mod retry;
pub mod version;

pub use cli::Args;
pub use config::ReleaseConfig;
pub use error::{ReleaseError, Result};
pub use git::{GitCli, WorkingTreeGate};
pub use manifest::ReleaseManifest;
pub use pipeline::{ParallelRunner, Pipeline, PipelineFinalizer, PipelineStep};
pub use publish::{DotnetCli, PackageTool, PushOutcome};
pub use registry::{NugetClient, RegistryClient, RegistryPackageInfo};
pub use release::{
    CandidateSet, ReleaseCandidate, ReleaseContext, ReleaseServices, build_release_pipeline,
};
