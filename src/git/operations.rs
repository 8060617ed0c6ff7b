//! Working tree gate trait and status types.
//!
//! The release only needs one question answered by version control: which
//! paths have uncommitted changes. The actual implementation is provided by
//! the cli_adapter module which runs `git status`.

use crate::error::Result;
use std::fmt;
use std::future::Future;
use std::path::Path;

/// Reports uncommitted changes in a working tree
pub trait WorkingTreeGate: Send + Sync + 'static {
    /// Every pending change under `root`; empty means clean
    fn pending_changes(
        &self,
        root: &Path,
    ) -> impl Future<Output = Result<Vec<PendingChange>>> + Send;
}

/// Kind of uncommitted change
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ChangeState {
    /// Content changed
    Modified,
    /// Newly staged
    Added,
    /// Removed
    Deleted,
    /// Renamed
    Renamed,
    /// Copied
    Copied,
    /// File type changed
    TypeChanged,
    /// Merge conflict
    Unmerged,
    /// Not tracked
    Untracked,
}

impl fmt::Display for ChangeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ChangeState::Modified => "modified",
            ChangeState::Added => "added",
            ChangeState::Deleted => "deleted",
            ChangeState::Renamed => "renamed",
            ChangeState::Copied => "copied",
            ChangeState::TypeChanged => "type changed",
            ChangeState::Unmerged => "unmerged",
            ChangeState::Untracked => "untracked",
        };
        f.write_str(label)
    }
}

/// One path with uncommitted changes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingChange {
    /// Path relative to the repository root
    pub path: String,
    /// What happened to it
    pub state: ChangeState,
}

fn state_from_code(code: char) -> Option<ChangeState> {
    match code {
        'M' => Some(ChangeState::Modified),
        'A' => Some(ChangeState::Added),
        'D' => Some(ChangeState::Deleted),
        'R' => Some(ChangeState::Renamed),
        'C' => Some(ChangeState::Copied),
        'T' => Some(ChangeState::TypeChanged),
        'U' => Some(ChangeState::Unmerged),
        '?' => Some(ChangeState::Untracked),
        _ => None,
    }
}

// DD, AU, UD, UA, DU, AA, UU
fn is_unmerged(index: char, worktree: char) -> bool {
    index == 'U' || worktree == 'U' || (index == worktree && matches!(index, 'A' | 'D'))
}

/// Parse `git status --porcelain=v1` output.
///
/// Index state wins over worktree state; for renames and copies the new
/// path is reported.
pub fn parse_porcelain(output: &str) -> Vec<PendingChange> {
    output
        .lines()
        .filter(|line| line.len() > 3)
        .filter_map(|line| {
            let mut codes = line.chars();
            let index = codes.next()?;
            let worktree = codes.next()?;
            let state = if is_unmerged(index, worktree) {
                ChangeState::Unmerged
            } else {
                state_from_code(index).or_else(|| state_from_code(worktree))?
            };

            let path = line.get(3..)?;
            let path = path.rsplit(" -> ").next().unwrap_or(path);
            Some(PendingChange {
                path: path.trim_matches('"').to_string(),
                state,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_porcelain() {
        let output = " M src/Acme.Core/Acme.Core.csproj\n\
                      A  docs/new.md\n\
                      R  old.cs -> new.cs\n\
                      ?? scratch.txt\n\
                      UU conflicted.cs\n\
                      \u{20}D gone.cs\n";

        let changes = parse_porcelain(output);
        assert_eq!(
            changes,
            vec![
                PendingChange {
                    path: "src/Acme.Core/Acme.Core.csproj".to_string(),
                    state: ChangeState::Modified
                },
                PendingChange {
                    path: "docs/new.md".to_string(),
                    state: ChangeState::Added
                },
                PendingChange {
                    path: "new.cs".to_string(),
                    state: ChangeState::Renamed
                },
                PendingChange {
                    path: "scratch.txt".to_string(),
                    state: ChangeState::Untracked
                },
                PendingChange {
                    path: "conflicted.cs".to_string(),
                    state: ChangeState::Unmerged
                },
                PendingChange {
                    path: "gone.cs".to_string(),
                    state: ChangeState::Deleted
                },
            ]
        );
    }

    #[test]
    fn test_parse_porcelain_clean() {
        assert!(parse_porcelain("").is_empty());
        assert!(parse_porcelain("\n").is_empty());
    }

    #[test]
    fn test_quoted_paths_are_unquoted() {
        let changes = parse_porcelain("?? \"with space.txt\"\n");
        assert_eq!(changes[0].path, "with space.txt");
    }
}
