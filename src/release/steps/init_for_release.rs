//! Gate on a clean tree, clear old package output, load the manifest.

use crate::error::Result;
use crate::git::{ChangeState, PendingChange, WorkingTreeGate};
use crate::manifest::{MANIFEST_FILE_NAME, ReleaseManifest, find_manifests};
use crate::pipeline::{BoxFuture, PRECONDITION_FAILED, PipelineStep, SUCCESS};
use crate::release::ReleaseContext;
use crate::version::PACK_DIR_NAME;
use futures_util::FutureExt;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

/// Prepares the context for a release
#[derive(Debug)]
pub struct InitForReleaseStep<G> {
    gate: Arc<G>,
}

impl<G: WorkingTreeGate> InitForReleaseStep<G> {
    /// Use `gate` to check for uncommitted changes
    pub fn new(gate: Arc<G>) -> Self {
        Self { gate }
    }
}

fn log_pending_changes(changes: &[PendingChange]) {
    let mut by_state: BTreeMap<ChangeState, Vec<&str>> = BTreeMap::new();
    for change in changes {
        by_state.entry(change.state).or_default().push(&change.path);
    }
    for (state, paths) in by_state {
        log::trace!("{state} ({}):", paths.len());
        for path in paths {
            log::trace!("  {path}");
        }
    }
}

/// Every package output directory under `root`
fn find_pack_dirs(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .into_iter()
        .filter_entry(|entry| entry.file_name() != ".git")
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_dir() && entry.file_name() == PACK_DIR_NAME)
        .map(|entry| entry.into_path())
        .collect()
}

async fn clean_pack_dirs(root: &Path) -> Result<()> {
    for dir in find_pack_dirs(root) {
        // A parent removed earlier in the loop takes nested matches with it
        if tokio::fs::try_exists(&dir).await.unwrap_or(false) {
            tokio::fs::remove_dir_all(&dir).await?;
            log::debug!("Removed {}", dir.display());
        }
    }
    Ok(())
}

impl<G: WorkingTreeGate> PipelineStep<ReleaseContext> for InitForReleaseStep<G> {
    fn name(&self) -> &str {
        "init-for-release"
    }

    fn run<'a>(&'a self, ctx: &'a mut ReleaseContext) -> BoxFuture<'a, Result<i32>> {
        async move {
            let changes = self.gate.pending_changes(&ctx.root).await?;
            if !changes.is_empty() {
                log::error!(
                    "Working tree has {} uncommitted change(s); commit or stash them before releasing",
                    changes.len()
                );
                log_pending_changes(&changes);
                return Ok(PRECONDITION_FAILED);
            }

            clean_pack_dirs(&ctx.root).await?;

            let manifests = find_manifests(&ctx.root);
            let manifest_path = match manifests.as_slice() {
                [single] => single,
                [] => {
                    log::error!(
                        "No {} found under {}",
                        MANIFEST_FILE_NAME,
                        ctx.root.display()
                    );
                    return Ok(PRECONDITION_FAILED);
                }
                many => {
                    log::error!(
                        "Found {} {} files under {}; expected exactly one",
                        many.len(),
                        MANIFEST_FILE_NAME,
                        ctx.root.display()
                    );
                    for path in many {
                        log::error!("  {}", path.display());
                    }
                    return Ok(PRECONDITION_FAILED);
                }
            };

            let manifest = ReleaseManifest::load(manifest_path).await?;
            ctx.candidates = manifest.candidates()?;
            ctx.tests = manifest.tests;
            ctx.sources = manifest.sources;

            log::info!(
                "Loaded {} release candidate(s) from {}",
                ctx.candidates.len(),
                manifest_path.display()
            );
            Ok(SUCCESS)
        }
        .boxed()
    }
}
