//! Recovering a checkout to a known-clean state

use std::fs;
use std::process::Command;
use tracing::{debug, warn};

use super::{GitError, WorkingTree};
use crate::util::log_cmd;

/// State files that mean a sequencing operation is (or was) mid-flight
const STATE_MARKERS: [&str; 4] = [
    "rebase-merge",
    "rebase-apply",
    "CHERRY_PICK_HEAD",
    "MERGE_HEAD",
];

/// Return the checkout to a clean state, whatever a previous run left behind.
///
/// Ordering matters: aborts run first so git can unwind its own state, then
/// any marker files the aborts did not clear are removed by hand, then the
/// tree and index are reset. Abort failures are expected (usually there is
/// nothing to abort) and ignored; the final reset and clean must succeed.
pub fn restore_clean_state(tree: &WorkingTree) -> Result<(), GitError> {
    for subcommand in ["rebase", "cherry-pick", "merge", "am"] {
        let mut cmd = Command::new("git");
        cmd.args([subcommand, "--abort"]).current_dir(tree.root());
        log_cmd(&cmd);
        match cmd.output() {
            Ok(output) if output.status.success() => {
                debug!(subcommand, "aborted leftover operation")
            }
            Ok(_) => {}
            Err(e) => return Err(GitError::OperationFailed(e.to_string())),
        }
    }

    for marker in STATE_MARKERS {
        let path = tree.git_dir().join(marker);
        if path.exists() {
            warn!(marker, "removing stale operation state");
            if path.is_dir() {
                fs::remove_dir_all(&path)?;
            } else {
                fs::remove_file(&path)?;
            }
        }
    }

    for args in [&["reset", "--hard"][..], &["clean", "-fd"][..]] {
        let mut cmd = Command::new("git");
        cmd.args(args).current_dir(tree.root());
        log_cmd(&cmd);
        let output = cmd
            .output()
            .map_err(|e| GitError::OperationFailed(e.to_string()))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(GitError::OperationFailed(stderr.to_string()));
        }
    }

    Ok(())
}

/// Set the committer identity and merge settings for this checkout.
///
/// Rebase and cherry-pick refuse to create commits without an identity, and
/// CI checkouts rarely have one. The conflict-marker style is pinned to the
/// two-way form the changelog resolver parses, overriding any diff3 setting
/// the checkout inherited. Config writes that fail are ignored (for example
/// a read-only config) since a usable identity may already exist.
pub fn ensure_identity(tree: &WorkingTree, name: &str, email: &str) -> Result<(), GitError> {
    for (key, value) in [
        ("user.name", name),
        ("user.email", email),
        ("rerere.enabled", "true"),
        ("merge.conflictstyle", "merge"),
    ] {
        let mut cmd = Command::new("git");
        cmd.args(["config", key, value]).current_dir(tree.root());
        log_cmd(&cmd);
        let output = cmd
            .output()
            .map_err(|e| GitError::OperationFailed(e.to_string()))?;
        if !output.status.success() {
            warn!(key, "failed to set git config");
        }
    }

    Ok(())
}
