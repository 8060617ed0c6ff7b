//! Package build, test and publish operations.
//!
//! The release steps only see the [`PackageTool`] trait; [`DotnetCli`]
//! implements it by shelling out to the .NET SDK.

mod command;
mod dotnet;

pub use command::{
    CommandOutput, OutputKind, categorize_line, display_command, run_command,
};
pub use dotnet::DotnetCli;

use crate::error::Result;
use crate::pipeline::{PRECONDITION_FAILED, SUCCESS};
use std::future::Future;
use std::path::Path;

/// Confirmation printed by `dotnet nuget push` on success
pub const PUSHED_MARKER: &str = "Your package was pushed.";

/// Marker for a version the registry already has
pub const CONFLICT_MARKER: &str = "Conflict";

/// External build/test/pack/push capability
pub trait PackageTool: Send + Sync + 'static {
    /// Run the tests of one project
    fn test(&self, project_file: &Path) -> impl Future<Output = Result<CommandOutput>> + Send;

    /// Produce a package for one project into `output_dir`
    fn pack(
        &self,
        project_file: &Path,
        output_dir: &Path,
    ) -> impl Future<Output = Result<CommandOutput>> + Send;

    /// Publish one package artifact
    fn push(
        &self,
        package: &Path,
        api_key: &str,
        source: &str,
    ) -> impl Future<Output = Result<CommandOutput>> + Send;
}

/// How a push attempt ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// The registry accepted the package
    Pushed,
    /// The registry already has this version
    Conflict,
    /// Output matched no known marker
    Unrecognized,
}

impl PushOutcome {
    /// Classify push output; markers are matched ignoring case
    pub fn classify(output: &str) -> Self {
        let lower = output.to_lowercase();
        if lower.contains(&PUSHED_MARKER.to_lowercase()) {
            PushOutcome::Pushed
        } else if lower.contains(&CONFLICT_MARKER.to_lowercase()) {
            PushOutcome::Conflict
        } else {
            PushOutcome::Unrecognized
        }
    }

    /// Per-candidate status code
    pub fn code(self) -> i32 {
        match self {
            PushOutcome::Pushed => SUCCESS,
            PushOutcome::Conflict | PushOutcome::Unrecognized => PRECONDITION_FAILED,
        }
    }
}
