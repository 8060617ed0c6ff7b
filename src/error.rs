//! Error types for nuget_release operations.
//!
//! Designed outcomes (dirty tree, nothing to release, missing project file)
//! are not errors: pipeline steps report them as status codes. Everything in
//! this module is a fault that unwinds the current step.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for nuget_release operations
pub type Result<T> = std::result::Result<T, ReleaseError>;

/// Main error type for all nuget_release operations
#[derive(Error, Debug)]
pub enum ReleaseError {
    /// Release manifest errors
    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),

    /// Build-metadata (project file) errors
    #[error("Project error: {0}")]
    Project(#[from] ProjectError),

    /// Registry query errors
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// External command errors
    #[error("Command error: {0}")]
    Command(#[from] CommandError),

    /// Git operation errors
    #[error("Git error: {0}")]
    Git(#[from] GitError),

    /// CLI argument errors
    #[error("CLI error: {0}")]
    Cli(#[from] CliError),

    /// A parallel unit or pipeline step panicked or was aborted
    #[error("Task failed: {0}")]
    Task(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Release manifest (`lib.release.json`) errors
#[derive(Error, Debug)]
pub enum ManifestError {
    /// Manifest could not be parsed
    #[error("Invalid manifest at {path}: {reason}")]
    Invalid {
        /// Manifest path
        path: PathBuf,
        /// Reason for the error
        reason: String,
    },

    /// A declared release carries an unusable version
    #[error("Invalid version '{version}' declared for '{name}': {reason}")]
    InvalidVersion {
        /// Release name
        name: String,
        /// Declared version text
        version: String,
        /// Reason for the error
        reason: String,
    },
}

/// Build-metadata file errors
#[derive(Error, Debug)]
pub enum ProjectError {
    /// The file has no property-group container to hold version fields
    #[error("No <PropertyGroup> found in {path}")]
    MissingPropertyGroup {
        /// Project file path
        path: PathBuf,
    },

    /// A step needed the project file before it was resolved
    #[error("Project file for '{name}' has not been resolved")]
    Unresolved {
        /// Candidate name
        name: String,
    },

    /// Restoring a project file from its temp copy failed
    #[error("Failed to restore {path}: {reason}")]
    RestoreFailed {
        /// Project file path
        path: PathBuf,
        /// Reason for the error
        reason: String,
    },

    /// A test project directory did not hold exactly one project file
    #[error("Expected exactly one project file in {dir}, found {found}")]
    AmbiguousProject {
        /// Directory searched
        dir: PathBuf,
        /// Number of project files found
        found: usize,
    },

    /// The pack output did not hold exactly one package artifact
    #[error("Expected exactly one package in {dir}, found {found}")]
    ArtifactCount {
        /// Pack output directory
        dir: PathBuf,
        /// Number of artifacts found
        found: usize,
    },
}

/// Registry query errors
#[derive(Error, Debug)]
pub enum RegistryError {
    /// HTTP transport failure
    #[error("Request to {url} failed: {reason}")]
    Http {
        /// Requested URL
        url: String,
        /// Reason for the error
        reason: String,
    },

    /// Non-success HTTP status
    #[error("{url} returned HTTP {status}")]
    Status {
        /// Requested URL
        url: String,
        /// HTTP status code
        status: u16,
    },

    /// The service index lists no search endpoint
    #[error("No SearchQueryService resource in service index {source_url}")]
    NoSearchService {
        /// Service index URL
        source_url: String,
    },

    /// A registry document did not have the expected shape
    #[error("Unexpected response from {url}: {reason}")]
    InvalidResponse {
        /// Requested URL
        url: String,
        /// Reason for the error
        reason: String,
    },
}

/// Git operation errors
#[derive(Error, Debug)]
pub enum GitError {
    /// Not a git repository
    #[error("Not a git repository: {path}")]
    NotRepository {
        /// Path that was inspected
        path: PathBuf,
    },

    /// Status query failed
    #[error("git status failed: {reason}")]
    StatusFailed {
        /// Reason for the error
        reason: String,
    },
}

/// External command errors
#[derive(Error, Debug)]
pub enum CommandError {
    /// The command could not be started
    #[error("Failed to start '{command}': {reason}")]
    SpawnFailed {
        /// Command line (credentials masked)
        command: String,
        /// Reason for the error
        reason: String,
    },

    /// The command ran and reported failure
    #[error("'{command}' failed (exit code {exit_code:?}): {reason}")]
    Failed {
        /// Command line (credentials masked)
        command: String,
        /// Exit code, if the process exited normally
        exit_code: Option<i32>,
        /// Reason for the error
        reason: String,
    },

    /// The command exceeded its timeout and was killed
    #[error("'{command}' timed out after {seconds}s")]
    TimedOut {
        /// Command line (credentials masked)
        command: String,
        /// Timeout in seconds
        seconds: u64,
    },
}

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Invalid command line arguments
    #[error("Invalid arguments: {reason}")]
    InvalidArguments {
        /// Reason for the error
        reason: String,
    },
}

impl ReleaseError {
    /// Get actionable recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            ReleaseError::Git(GitError::NotRepository { .. }) => vec![
                "Point the release root at a directory inside a git working tree".to_string(),
            ],
            ReleaseError::Manifest(ManifestError::Invalid { .. }) => vec![
                "Check lib.release.json against the expected Releases/Tests/Sources layout"
                    .to_string(),
            ],
            ReleaseError::Project(ProjectError::MissingPropertyGroup { path }) => vec![format!(
                "Add a <PropertyGroup> without a Condition to {}",
                path.display()
            )],
            ReleaseError::Project(ProjectError::ArtifactCount { .. }) => vec![
                "Make sure the project produces a single .nupkg per pack".to_string(),
            ],
            ReleaseError::Registry(_) => vec![
                "Verify the registry source URLs in lib.release.json are reachable".to_string(),
                "Raise NUGET_RELEASE_RETRY_REGISTRY for flaky networks".to_string(),
            ],
            ReleaseError::Command(CommandError::SpawnFailed { .. }) => vec![
                "Install the .NET SDK and make sure 'dotnet' is on PATH".to_string(),
            ],
            ReleaseError::Command(CommandError::TimedOut { .. }) => vec![
                "Raise NUGET_RELEASE_COMMAND_TIMEOUT if the build is legitimately slow"
                    .to_string(),
            ],
            _ => vec!["Check the log output above for specific details".to_string()],
        }
    }

    /// Check if this error is worth retrying
    pub fn is_recoverable(&self) -> bool {
        match self {
            ReleaseError::Registry(RegistryError::Http { .. }) => true,
            ReleaseError::Registry(RegistryError::Status { status, .. }) => {
                *status == 429 || *status >= 500
            }
            _ => false,
        }
    }
}
