//! Adapter between the WorkingTreeGate trait and the `git` executable.

use crate::error::{GitError, Result};
use crate::git::{PendingChange, WorkingTreeGate, parse_porcelain};
use std::path::Path;
use tokio::process::Command;

/// Working tree gate backed by `git status`
#[derive(Debug, Clone)]
pub struct GitCli {
    program: String,
}

impl Default for GitCli {
    fn default() -> Self {
        Self {
            program: "git".to_string(),
        }
    }
}

impl GitCli {
    /// Gate using a specific git executable
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl WorkingTreeGate for GitCli {
    async fn pending_changes(&self, root: &Path) -> Result<Vec<PendingChange>> {
        let output = Command::new(&self.program)
            .args(["status", "--porcelain=v1", "--untracked-files=all"])
            .current_dir(root)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| GitError::StatusFailed {
                reason: format!("failed to run {}: {}", self.program, e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.to_ascii_lowercase().contains("not a git repository") {
                return Err(GitError::NotRepository {
                    path: root.to_path_buf(),
                }
                .into());
            }
            return Err(GitError::StatusFailed {
                reason: stderr.trim().to_string(),
            }
            .into());
        }

        Ok(parse_porcelain(&String::from_utf8_lossy(&output.stdout)))
    }
}
