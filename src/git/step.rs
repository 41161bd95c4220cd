//! Stepping rebase and cherry-pick operations
//!
//! `git rebase` and `git cherry-pick` report "stopped on a conflict" and
//! "this commit became empty" only through exit codes and prose on
//! stdout/stderr. [`classify`] is the one place that prose is interpreted;
//! everything else in the crate branches on [`StepStatus`].

use std::process::Command;

use super::{GitError, WorkingTree};
use crate::util::log_cmd;

/// Which sequencing operation is being driven
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    Rebase,
    CherryPick,
}

impl OpKind {
    pub fn subcommand(&self) -> &'static str {
        match self {
            OpKind::Rebase => "rebase",
            OpKind::CherryPick => "cherry-pick",
        }
    }

    /// State files git leaves under `.git` while this operation is mid-flight
    fn state_markers(&self) -> &'static [&'static str] {
        match self {
            OpKind::Rebase => &["rebase-merge", "rebase-apply"],
            OpKind::CherryPick => &["CHERRY_PICK_HEAD"],
        }
    }
}

impl std::fmt::Display for OpKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.subcommand())
    }
}

/// Outcome of one step of a rebase or cherry-pick
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepStatus {
    /// The step applied cleanly
    Clean,
    /// The step stopped on conflicts that need resolving
    Conflict,
    /// The commit being applied became empty (already present upstream, or
    /// emptied by conflict resolution)
    EmptyCommit,
    /// Anything else: bad revision, unborn branch, dirty tree
    Fatal(String),
}

/// Classify the output of a rebase or cherry-pick step.
///
/// Matching is case-sensitive on purpose: "CONFLICT" is git's conflict
/// banner, while the empty-commit hint contains lowercase "conflict
/// resolution" and must not be taken for one.
pub fn classify(success: bool, output_text: &str) -> StepStatus {
    if success {
        return StepStatus::Clean;
    }

    const EMPTY_MARKERS: [&str; 3] = [
        "nothing to commit",
        "No changes",
        "previous cherry-pick is now empty",
    ];
    if EMPTY_MARKERS.iter().any(|m| output_text.contains(m)) {
        return StepStatus::EmptyCommit;
    }

    const CONFLICT_MARKERS: [&str; 3] = ["CONFLICT", "could not apply", "Merge conflict in"];
    if CONFLICT_MARKERS.iter().any(|m| output_text.contains(m)) {
        return StepStatus::Conflict;
    }

    StepStatus::Fatal(output_text.trim().to_string())
}

fn combined_text(output: &std::process::Output) -> String {
    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    text.push('\n');
    text.push_str(&String::from_utf8_lossy(&output.stderr));
    text
}

/// Start rebasing the current branch onto `target`
pub fn rebase_onto(tree: &WorkingTree, target: &str) -> Result<StepStatus, GitError> {
    let mut cmd = Command::new("git");
    cmd.args(["rebase", target])
        .env("GIT_EDITOR", "true")
        .current_dir(tree.root());
    log_cmd(&cmd);
    let output = cmd
        .output()
        .map_err(|e| GitError::OperationFailed(e.to_string()))?;

    Ok(classify(output.status.success(), &combined_text(&output)))
}

/// Apply a single commit onto the current branch
pub fn cherry_pick(tree: &WorkingTree, sha: &str) -> Result<StepStatus, GitError> {
    let mut cmd = Command::new("git");
    cmd.args(["cherry-pick", sha])
        .env("GIT_EDITOR", "true")
        .current_dir(tree.root());
    log_cmd(&cmd);
    let output = cmd
        .output()
        .map_err(|e| GitError::OperationFailed(e.to_string()))?;

    Ok(classify(output.status.success(), &combined_text(&output)))
}

/// Continue a stopped operation after conflicts were staged
pub fn continue_op(tree: &WorkingTree, kind: OpKind) -> Result<StepStatus, GitError> {
    let mut cmd = Command::new("git");
    cmd.args([kind.subcommand(), "--continue"])
        .env("GIT_EDITOR", "true")
        .current_dir(tree.root());
    log_cmd(&cmd);
    let output = cmd
        .output()
        .map_err(|e| GitError::OperationFailed(e.to_string()))?;

    Ok(classify(output.status.success(), &combined_text(&output)))
}

/// Skip the commit the operation is currently stopped on
pub fn skip_op(tree: &WorkingTree, kind: OpKind) -> Result<StepStatus, GitError> {
    let mut cmd = Command::new("git");
    cmd.args([kind.subcommand(), "--skip"])
        .env("GIT_EDITOR", "true")
        .current_dir(tree.root());
    log_cmd(&cmd);
    let output = cmd
        .output()
        .map_err(|e| GitError::OperationFailed(e.to_string()))?;

    Ok(classify(output.status.success(), &combined_text(&output)))
}

/// Abort the operation and return the branch to its pre-operation state
pub fn abort_op(tree: &WorkingTree, kind: OpKind) -> Result<(), GitError> {
    let mut cmd = Command::new("git");
    cmd.args([kind.subcommand(), "--abort"]).current_dir(tree.root());
    log_cmd(&cmd);
    let output = cmd
        .output()
        .map_err(|e| GitError::OperationFailed(e.to_string()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(GitError::OperationFailed(format!(
            "Failed to abort {}: {}",
            kind,
            stderr.trim()
        )));
    }

    Ok(())
}

/// Whether an operation of this kind is currently mid-flight.
///
/// Checked via git's own state files rather than parsing `git status`; the
/// driver uses this to tell "skip the stopped commit" apart from "the whole
/// operation already finished".
pub fn operation_in_progress(tree: &WorkingTree, kind: OpKind) -> bool {
    kind.state_markers()
        .iter()
        .any(|marker| tree.git_dir().join(marker).exists())
}
