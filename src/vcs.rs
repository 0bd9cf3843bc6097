//! Git-backed checkpoint diffing: the Work Selector's source 2, "paths
//! changed since the previous VCS checkpoint" (spec.md §4.1).
//!
//! Grounded on `core::pipeline::file_discovery::find_repository`'s use of
//! `git2::Repository::discover`, generalized from "collect every tracked
//! file" into "collect files that changed relative to a stored checkpoint
//! commit".

use std::path::{Path, PathBuf};

use git2::{Repository, StatusOptions};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// A VCS checkpoint: the commit OID the previous run observed, as a
/// string (empty if no prior checkpoint exists).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint(pub String);

/// Discover the repository containing `root` and return both the paths
/// changed since `checkpoint` (tracked-modified and untracked, per
/// spec.md §4.1 source 2) and the new checkpoint to persist.
///
/// Returns `(Vec::new(), checkpoint unchanged)` when no repository is
/// found or git operations fail — failures from this source are logged
/// and skipped, never aborting the Work Selector (spec.md §4.1).
pub fn changed_since(root: &Path, checkpoint: &Checkpoint) -> (Vec<PathBuf>, Checkpoint) {
    let repo = match Repository::discover(root) {
        Ok(repo) => repo,
        Err(_) => return (Vec::new(), checkpoint.clone()),
    };
    let Some(workdir) = repo.workdir() else {
        return (Vec::new(), checkpoint.clone());
    };

    let new_checkpoint = head_oid(&repo).unwrap_or_else(|| checkpoint.0.clone());

    let mut options = StatusOptions::new();
    options.include_untracked(true).recurse_untracked_dirs(true);

    let statuses = match repo.statuses(Some(&mut options)) {
        Ok(statuses) => statuses,
        Err(err) => {
            warn!("git status scan failed: {err}");
            return (Vec::new(), Checkpoint(new_checkpoint));
        }
    };

    let mut changed = Vec::new();
    for entry in statuses.iter() {
        if !entry.status().is_wt_modified()
            && !entry.status().is_wt_new()
            && !entry.status().is_index_modified()
            && !entry.status().is_index_new()
        {
            continue;
        }
        if let Some(rel) = entry.path() {
            changed.push(workdir.join(rel));
        }
    }

    (changed, Checkpoint(new_checkpoint))
}

fn head_oid(repo: &Repository) -> Option<String> {
    repo.head().ok()?.target().map(|oid| oid.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command;
    use tempfile::tempdir;

    fn init_repo(dir: &Path) {
        Command::new("git").arg("init").arg("-q").current_dir(dir).status().unwrap();
        Command::new("git")
            .args(["config", "user.email", "test@example.com"])
            .current_dir(dir)
            .status()
            .unwrap();
        Command::new("git")
            .args(["config", "user.name", "Test"])
            .current_dir(dir)
            .status()
            .unwrap();
    }

    #[test]
    fn test_no_repository_returns_empty() {
        let dir = tempdir().unwrap();
        let (changed, checkpoint) = changed_since(dir.path(), &Checkpoint::default());
        assert!(changed.is_empty());
        assert_eq!(checkpoint, Checkpoint::default());
    }

    #[test]
    fn test_untracked_file_detected() {
        let dir = tempdir().unwrap();
        init_repo(dir.path());
        std::fs::write(dir.path().join("a.js"), "console.log(1)").unwrap();

        let (changed, _) = changed_since(dir.path(), &Checkpoint::default());
        assert_eq!(changed.len(), 1);
    }
}
