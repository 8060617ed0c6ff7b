//! Project file version patching.
//!
//! A project file is always copied to its sibling `.tmp` undo record before
//! it is rewritten. [`restore`] copies the record back and deletes it.

mod editor;

pub use editor::{VersionFields, apply_version_fields};

use crate::error::{ProjectError, Result};
use crate::release::ReleaseCandidate;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Build-metadata file extension
pub const PROJECT_EXTENSION: &str = "csproj";

/// Suffix appended to a project file name to form its undo record
pub const TEMP_SUFFIX: &str = ".tmp";

/// Name of the pack output directory under `bin/`
pub const PACK_DIR_NAME: &str = ".nupkg";

/// `<root>/<name>/<name>.csproj`
pub fn project_file_path(root: &Path, name: &str) -> PathBuf {
    root.join(name).join(format!("{name}.{PROJECT_EXTENSION}"))
}

/// Sibling undo record: the project file name plus [`TEMP_SUFFIX`]
pub fn temp_path_for(project_file: &Path) -> PathBuf {
    let mut name = project_file
        .file_name()
        .map(OsString::from)
        .unwrap_or_default();
    name.push(TEMP_SUFFIX);
    project_file.with_file_name(name)
}

/// `<project dir>/bin/.nupkg`
pub fn pack_dir_for(project_file: &Path) -> PathBuf {
    project_file
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join("bin")
        .join(PACK_DIR_NAME)
}

/// Field values for a candidate
pub fn fields_for(candidate: &ReleaseCandidate) -> VersionFields {
    let numeric = candidate.numeric_version();
    VersionFields {
        version: candidate.version().to_string(),
        assembly_version: numeric.clone(),
        file_version: numeric,
    }
}

/// Copy the project file to its undo record, overwriting any stale copy
pub async fn backup(project_file: &Path) -> Result<PathBuf> {
    let temp = temp_path_for(project_file);
    tokio::fs::copy(project_file, &temp).await?;
    log::trace!("Backed up {} to {}", project_file.display(), temp.display());
    Ok(temp)
}

/// Back up the candidate's project file, then rewrite its version fields
pub async fn patch_project_file(candidate: &ReleaseCandidate) -> Result<()> {
    let project_file = candidate.require_project_file()?;
    backup(project_file).await?;

    let content = tokio::fs::read_to_string(project_file).await?;
    let patched = apply_version_fields(&content, project_file, &fields_for(candidate))?;
    tokio::fs::write(project_file, patched).await?;

    log::debug!(
        "Patched {} to version {}",
        project_file.display(),
        candidate.version()
    );
    Ok(())
}

/// Put the undo record back over the project file and delete it.
///
/// Returns `false` when there is no undo record, meaning the file was never
/// backed up and so never modified.
pub async fn restore(project_file: &Path) -> Result<bool> {
    let temp = temp_path_for(project_file);
    if !tokio::fs::try_exists(&temp).await.unwrap_or(false) {
        return Ok(false);
    }

    let failed = |e: std::io::Error| ProjectError::RestoreFailed {
        path: project_file.to_path_buf(),
        reason: e.to_string(),
    };
    tokio::fs::copy(&temp, project_file).await.map_err(failed)?;
    tokio::fs::remove_file(&temp).await.map_err(failed)?;

    log::trace!("Restored {}", project_file.display());
    Ok(true)
}
