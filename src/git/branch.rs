//! Git branch operations

use std::process::Command;

use super::{GitError, WorkingTree};
use crate::util::log_cmd;

/// Checkout an existing branch
pub fn checkout_branch(tree: &WorkingTree, branch_name: &str) -> Result<(), GitError> {
    // Check if branch exists
    if !branch_exists(tree, branch_name) {
        return Err(GitError::BranchNotFound(branch_name.to_string()));
    }

    let mut cmd = Command::new("git");
    cmd.args(["checkout", branch_name]).current_dir(tree.root());
    log_cmd(&cmd);
    let output = cmd
        .output()
        .map_err(|e| GitError::OperationFailed(e.to_string()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);

        // Detect worktree conflict and provide helpful message
        if stderr.contains("is already used by worktree at") {
            return Err(GitError::OperationFailed(format!(
                "Branch '{}' is checked out in another worktree. \
                 Run from that worktree or remove it first.",
                branch_name
            )));
        }

        return Err(GitError::OperationFailed(stderr.to_string()));
    }

    Ok(())
}

/// Create (or reset) a branch at `start_point` and check it out.
///
/// Uses `checkout -B`, so re-running on a leftover branch from an earlier
/// attempt resets it instead of failing.
pub fn create_branch_from(
    tree: &WorkingTree,
    branch_name: &str,
    start_point: &str,
) -> Result<(), GitError> {
    let mut cmd = Command::new("git");
    cmd.args(["checkout", "-B", branch_name, start_point])
        .current_dir(tree.root());
    log_cmd(&cmd);
    let output = cmd
        .output()
        .map_err(|e| GitError::OperationFailed(e.to_string()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);

        if stderr.contains("is already used by worktree at") {
            return Err(GitError::OperationFailed(format!(
                "Branch '{}' is checked out in another worktree. \
                 Run from that worktree or remove it first.",
                branch_name
            )));
        }

        return Err(GitError::OperationFailed(stderr.to_string()));
    }

    Ok(())
}

/// Check if a local branch exists
pub fn branch_exists(tree: &WorkingTree, branch_name: &str) -> bool {
    let mut cmd = Command::new("git");
    cmd.args([
        "rev-parse",
        "--verify",
        &format!("refs/heads/{}", branch_name),
    ])
    .current_dir(tree.root());
    log_cmd(&cmd);
    let output = cmd.output();

    output.map(|o| o.status.success()).unwrap_or(false)
}

/// Delete a local branch, even if unmerged
pub fn delete_branch(tree: &WorkingTree, branch_name: &str) -> Result<(), GitError> {
    // Check if it's the current branch
    let current = tree.current_branch()?;
    if current == branch_name {
        return Err(GitError::OperationFailed(
            "Cannot delete the currently checked out branch".to_string(),
        ));
    }

    let mut cmd = Command::new("git");
    cmd.args(["branch", "-D", branch_name])
        .current_dir(tree.root());
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

/// Make sure `branch_name` is checked out.
///
/// A rebase or cherry-pick that was aborted mid-flight can leave HEAD
/// detached; this puts the checkout back on the expected branch before a
/// push, and is a no-op when already there.
pub fn ensure_on_branch(tree: &WorkingTree, branch_name: &str) -> Result<(), GitError> {
    let mut cmd = Command::new("git");
    cmd.args(["branch", "--show-current"]).current_dir(tree.root());
    log_cmd(&cmd);
    let output = cmd
        .output()
        .map_err(|e| GitError::OperationFailed(e.to_string()))?;

    let current = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if current == branch_name {
        return Ok(());
    }

    checkout_branch(tree, branch_name)
}
