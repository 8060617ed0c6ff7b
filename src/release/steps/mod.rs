//! The release pipeline steps, in execution order.

mod apply_version;
mod assert_root;
mod init_for_release;
mod init_versions;
mod pack;
mod push;
mod run_tests;

pub use apply_version::ApplyVersionStep;
pub use assert_root::AssertRootStep;
pub use init_for_release::InitForReleaseStep;
pub use init_versions::InitVersionsStep;
pub use pack::PackStep;
pub use push::{PACKAGE_EXTENSION, PushStep};
pub use run_tests::RunTestsStep;

use crate::error::Result;
use std::path::{Path, PathBuf};

/// Files directly inside `dir` ending in `.<extension>`, sorted
pub(crate) fn files_with_extension(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let pattern = format!(
        "{}/*.{}",
        glob::Pattern::escape(&dir.to_string_lossy()),
        extension
    );
    let mut files = Vec::new();
    for entry in glob::glob(&pattern).map_err(|e| std::io::Error::other(e.msg))? {
        let path = entry.map_err(glob::GlobError::into_error)?;
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
