//! Git remote operations

use std::process::Command;

use super::{GitError, WorkingTree};
use crate::util::log_cmd;

/// Make sure a remote called `name` exists and points at `url`.
///
/// Adds the remote when missing, rewrites its URL when it differs (the same
/// remote name can end up pointing at a different fork between runs).
pub fn ensure_remote(tree: &WorkingTree, name: &str, url: &str) -> Result<(), GitError> {
    let args: [&str; 3] = match get_remote_url(tree, name)?.as_deref() {
        Some(current) if current == url => return Ok(()),
        Some(_) => ["remote", "set-url", name],
        None => ["remote", "add", name],
    };

    let mut cmd = Command::new("git");
    cmd.args(args).arg(url).current_dir(tree.root());
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

/// Get the URL of a remote
pub fn get_remote_url(tree: &WorkingTree, remote: &str) -> Result<Option<String>, GitError> {
    let mut cmd = Command::new("git");
    cmd.args(["remote", "get-url", remote]).current_dir(tree.root());
    log_cmd(&cmd);
    let output = cmd
        .output()
        .map_err(|e| GitError::OperationFailed(e.to_string()))?;

    if output.status.success() {
        let url = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok(Some(url))
    } else {
        Ok(None)
    }
}

/// Fetch a refspec (or plain branch name) from a remote
pub fn fetch(tree: &WorkingTree, remote: &str, refspec: &str) -> Result<(), GitError> {
    let mut cmd = Command::new("git");
    cmd.args(["fetch", remote, refspec]).current_dir(tree.root());
    log_cmd(&cmd);
    let output = cmd
        .output()
        .map_err(|e| GitError::OperationFailed(e.to_string()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(GitError::OperationFailed(format!(
            "Failed to fetch '{}' from '{}': {}",
            refspec,
            remote,
            stderr.trim()
        )));
    }

    Ok(())
}

/// Fast-forward the current branch from a remote branch.
///
/// `--ff-only` keeps a stale local branch from producing a merge commit; if
/// the local and remote branches diverged the pull fails and the caller
/// decides what to do.
pub fn pull_ff_only(tree: &WorkingTree, remote: &str, branch: &str) -> Result<(), GitError> {
    let mut cmd = Command::new("git");
    cmd.args(["pull", "--ff-only", remote, branch])
        .current_dir(tree.root());
    log_cmd(&cmd);
    let output = cmd
        .output()
        .map_err(|e| GitError::OperationFailed(e.to_string()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.contains("Not possible to fast-forward") || stderr.contains("divergent") {
            return Err(GitError::OperationFailed(format!(
                "Local branch '{}' has diverged from '{}/{}'. Reset it before retrying.\n\
                 (Original: {})",
                branch,
                remote,
                branch,
                stderr.trim()
            )));
        }
        return Err(GitError::OperationFailed(stderr.to_string()));
    }

    Ok(())
}

/// Push a refspec with `--force-with-lease`.
///
/// The lease rejects the push when the remote ref moved since it was last
/// fetched, so commits pushed by a human in the meantime are never clobbered
/// silently.
pub fn push_with_lease(tree: &WorkingTree, remote: &str, refspec: &str) -> Result<(), GitError> {
    let mut cmd = Command::new("git");
    cmd.args(["push", "--force-with-lease", remote, refspec])
        .current_dir(tree.root());
    log_cmd(&cmd);
    let output = cmd
        .output()
        .map_err(|e| GitError::OperationFailed(e.to_string()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(GitError::OperationFailed(interpret_push_error(&stderr)));
    }

    Ok(())
}

/// Push a refspec with plain `--force`, overwriting whatever is on the remote
pub fn force_push(tree: &WorkingTree, remote: &str, refspec: &str) -> Result<(), GitError> {
    let mut cmd = Command::new("git");
    cmd.args(["push", "--force", remote, refspec])
        .current_dir(tree.root());
    log_cmd(&cmd);
    let output = cmd
        .output()
        .map_err(|e| GitError::OperationFailed(e.to_string()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(GitError::OperationFailed(interpret_push_error(&stderr)));
    }

    Ok(())
}

/// Interpret common git push errors into user-friendly messages
fn interpret_push_error(stderr: &str) -> String {
    let lower = stderr.to_lowercase();
    if lower.contains("stale info") || lower.contains("[rejected]") {
        return format!(
            "Push rejected: the remote branch moved since it was fetched. Someone may have \
             pushed in the meantime; re-run, or pass --force to overwrite.\n\
             (Original: {})",
            stderr.trim()
        );
    }
    if lower.contains("could not read from remote") || lower.contains("repository not found") {
        return format!(
            "Cannot reach the remote. Check the network and the remote URL.\n\
             (Original: {})",
            stderr.trim()
        );
    }
    if lower.contains("permission denied") || lower.contains("authentication failed") {
        return format!(
            "Authentication failed. Check GITHUB_TOKEN or refresh credentials with \
             `gh auth login`.\n\
             (Original: {})",
            stderr.trim()
        );
    }
    stderr.to_string()
}
