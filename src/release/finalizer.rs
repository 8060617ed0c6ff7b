//! Puts every patched project file back the way it was.

use crate::error::{ReleaseError, Result};
use crate::pipeline::{BoxFuture, ParallelRunner, PipelineFinalizer};
use crate::release::ReleaseContext;
use crate::version::restore;
use futures_util::FutureExt;
use std::path::PathBuf;

/// Restores each resolved project file from its undo record
#[derive(Debug, Clone)]
pub struct RestoreProjectFiles {
    runner: ParallelRunner,
}

impl RestoreProjectFiles {
    /// Restore in parallel through `runner`
    pub fn new(runner: ParallelRunner) -> Self {
        Self { runner }
    }
}

impl PipelineFinalizer<ReleaseContext> for RestoreProjectFiles {
    fn finalize<'a>(&'a self, ctx: &'a mut ReleaseContext) -> BoxFuture<'a, Result<()>> {
        async move {
            log::debug!("Release context at finalization:\n{}", ctx.summary());

            let projects: Vec<PathBuf> = ctx
                .candidates
                .iter()
                .filter_map(|c| c.project_file().map(PathBuf::from))
                .collect();
            if projects.is_empty() {
                return Ok(());
            }

            let restored = self
                .runner
                .run(projects, |project| async move {
                    let restored = restore(&project).await?;
                    if !restored {
                        log::debug!("No backup of {}; nothing to restore", project.display());
                    }
                    Ok::<bool, ReleaseError>(restored)
                })
                .await?;

            let count = restored.iter().filter(|r| **r).count();
            log::debug!("Restored {count} project file(s)");
            Ok(())
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::release::ReleaseCandidate;
    use crate::version::{patch_project_file, project_file_path, temp_path_for};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_restores_patched_and_skips_untouched() {
        let root = TempDir::new().expect("tempdir");
        let original = "<Project><PropertyGroup><Version>1.0.0</Version></PropertyGroup></Project>";

        let mut ctx = ReleaseContext::new(root.path(), "key", false);
        for name in ["Acme.Core", "Acme.Web"] {
            let path = project_file_path(root.path(), name);
            std::fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
            std::fs::write(&path, original).expect("write");
            let mut candidate = ReleaseCandidate::new(name, "2.0.0", None).expect("candidate");
            candidate.set_project_file(path);
            ctx.candidates.insert(candidate);
        }
        // An unresolved candidate is ignored
        ctx.candidates
            .insert(ReleaseCandidate::new("Acme.Unresolved", "2.0.0", None).expect("candidate"));

        let core = ctx.candidates.get("Acme.Core").expect("present").clone();
        patch_project_file(&core).await.expect("patched");

        RestoreProjectFiles::new(ParallelRunner::unbounded())
            .finalize(&mut ctx)
            .await
            .expect("restored");

        for name in ["Acme.Core", "Acme.Web"] {
            let path = project_file_path(root.path(), name);
            assert_eq!(std::fs::read_to_string(&path).expect("read"), original);
            assert!(!temp_path_for(&path).exists());
        }
    }
}
