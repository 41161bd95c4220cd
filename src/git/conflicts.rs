//! Conflicted-path handling during a stopped operation

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::process::Command;
use tracing::debug;

use super::{GitError, WorkingTree};
use crate::util::log_cmd;

/// Which side of a conflict wins for non-changelog files.
///
/// Sides are stage names, not fixed branches: during a rebase "ours" is the
/// branch being rebased onto and "theirs" is the commit being replayed, while
/// during a cherry-pick "ours" is the branch receiving the pick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictSide {
    /// Keep the incoming change (the commit being replayed or picked)
    #[default]
    Theirs,
    /// Keep the current branch's version
    Ours,
}

impl ConflictSide {
    pub fn checkout_flag(&self) -> &'static str {
        match self {
            ConflictSide::Theirs => "--theirs",
            ConflictSide::Ours => "--ours",
        }
    }
}

impl std::fmt::Display for ConflictSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConflictSide::Theirs => write!(f, "theirs"),
            ConflictSide::Ours => write!(f, "ours"),
        }
    }
}

/// Paths with unresolved conflicts, relative to the working tree root
pub fn unmerged_paths(tree: &WorkingTree) -> Result<Vec<String>, GitError> {
    let mut cmd = Command::new("git");
    cmd.args(["diff", "--name-only", "--diff-filter=U"])
        .current_dir(tree.root());
    log_cmd(&cmd);
    let output = cmd
        .output()
        .map_err(|e| GitError::OperationFailed(e.to_string()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(GitError::OperationFailed(stderr.to_string()));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(stdout.lines().map(|s| s.to_string()).collect())
}

/// Resolve one conflicted path by taking a whole side, then stage it.
///
/// When the chosen side deleted the file (`git checkout --theirs` reports the
/// path "does not have their version"), the resolution is the deletion and
/// the path is staged with `git rm` instead.
pub fn take_side(tree: &WorkingTree, path: &str, side: ConflictSide) -> Result<(), GitError> {
    let mut cmd = Command::new("git");
    cmd.args(["checkout", side.checkout_flag(), "--", path])
        .current_dir(tree.root());
    log_cmd(&cmd);
    let output = cmd
        .output()
        .map_err(|e| GitError::OperationFailed(e.to_string()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.contains("does not have") {
            debug!(path, %side, "side deleted the file, staging removal");
            let mut cmd = Command::new("git");
            cmd.args(["rm", "-f", "--", path]).current_dir(tree.root());
            log_cmd(&cmd);
            let output = cmd
                .output()
                .map_err(|e| GitError::OperationFailed(e.to_string()))?;
            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                return Err(GitError::OperationFailed(stderr.to_string()));
            }
            return Ok(());
        }
        return Err(GitError::OperationFailed(stderr.to_string()));
    }

    stage_path(tree, path)
}

/// Stage a single path
pub fn stage_path(tree: &WorkingTree, path: &str) -> Result<(), GitError> {
    let mut cmd = Command::new("git");
    cmd.args(["add", "--", path]).current_dir(tree.root());
    log_cmd(&cmd);
    let output = cmd
        .output()
        .map_err(|e| GitError::OperationFailed(e.to_string()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(GitError::OperationFailed(stderr.to_string()));
    }

    Ok(())
}
