//! Driving a rebase or cherry-pick to completion
//!
//! [`Driver`] owns the loop around a sequencing operation: start it, and
//! while git keeps stopping, either resolve the conflicts and continue, skip
//! commits that became empty, or abort and surface a structured error. The
//! checkout is only ever left in one of two states: the operation finished,
//! or it was aborted back to where it started.

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::git::{self, ConflictSide, GitError, OpKind, StepStatus, WorkingTree};
use crate::resolve::{self, BlockOrder, ChangelogError, ChangelogOutcome};

/// Default upper bound on conflict-resolution passes per drive
pub const DEFAULT_MAX_PASSES: u32 = 20;

/// The operation to drive
#[derive(Debug, Clone)]
pub enum Operation {
    /// Rebase the current branch onto a target ref
    Rebase { target: String },
    /// Apply commits one at a time onto the current branch, oldest first
    CherryPick { commits: Vec<String> },
}

/// How conflicts are resolved while driving
#[derive(Debug, Clone)]
pub struct ResolutionPolicy {
    /// Changelog path relative to the checkout root; conflicts here are
    /// merged by keeping both sides instead of picking one
    pub changelog_path: String,
    /// Order of merged changelog blocks
    pub order: BlockOrder,
    /// Side taken for every other conflicted path
    pub side: ConflictSide,
    /// Resolution passes allowed before giving up.
    /// Each stop of the underlying operation costs one pass, so the bound
    /// also caps how long a pathological rebase can run.
    pub max_passes: u32,
}

impl Default for ResolutionPolicy {
    fn default() -> Self {
        Self {
            changelog_path: crate::config::DEFAULT_CHANGELOG.to_string(),
            order: BlockOrder::default(),
            side: ConflictSide::default(),
            max_passes: DEFAULT_MAX_PASSES,
        }
    }
}

#[derive(Error, Debug)]
pub enum DriverError {
    #[error("Unresolved conflicts remain in: {}", paths.join(", "))]
    UnresolvedConflicts { paths: Vec<String> },

    #[error("Gave up after {passes} conflict-resolution passes")]
    ResolutionBudgetExceeded { passes: u32 },

    #[error("{kind} failed: {message}")]
    StepFailed { kind: OpKind, message: String },

    #[error(transparent)]
    Git(#[from] GitError),

    #[error("Changelog resolution failed: {0}")]
    Changelog(#[from] ChangelogError),
}

/// What a completed drive did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DriveSummary {
    /// Cherry-picks that landed, or 1 for a completed rebase
    pub applied: usize,
    /// Commits dropped because they became empty
    pub skipped: usize,
    /// Conflict-resolution passes spent
    pub resolution_passes: u32,
}

/// Drives one operation against one checkout
pub struct Driver<'a> {
    tree: &'a WorkingTree,
    policy: ResolutionPolicy,
}

impl<'a> Driver<'a> {
    pub fn new(tree: &'a WorkingTree, policy: ResolutionPolicy) -> Self {
        Self { tree, policy }
    }

    /// Run the operation to completion.
    ///
    /// On any error the underlying git operation has already been aborted;
    /// the branch is back at its pre-operation position.
    pub fn run(&self, op: &Operation) -> Result<DriveSummary, DriverError> {
        let mut summary = DriveSummary::default();

        match op {
            Operation::Rebase { target } => {
                info!(target, "starting rebase");
                let status = git::rebase_onto(self.tree, target)?;
                let skips = self.settle(OpKind::Rebase, status, &mut summary)?;
                summary.applied += 1;
                summary.skipped += skips;
            }
            Operation::CherryPick { commits } => {
                info!(count = commits.len(), "starting cherry-pick");
                for sha in commits {
                    debug!(sha, "picking commit");
                    let status = git::cherry_pick(self.tree, sha)?;
                    let skips = self.settle(OpKind::CherryPick, status, &mut summary)?;
                    if skips == 0 {
                        summary.applied += 1;
                    } else {
                        summary.skipped += skips;
                    }
                }
            }
        }

        Ok(summary)
    }

    /// Step the operation until it finishes, returning how many commits were
    /// skipped along the way. Only `resolution_passes` is tallied into
    /// `summary` here; applied/skipped accounting stays with [`Self::run`].
    fn settle(
        &self,
        kind: OpKind,
        first: StepStatus,
        summary: &mut DriveSummary,
    ) -> Result<usize, DriverError> {
        let mut status = first;
        let mut skips = 0usize;

        loop {
            match status {
                StepStatus::Clean => return Ok(skips),

                StepStatus::EmptyCommit => {
                    skips += 1;
                    if git::operation_in_progress(self.tree, kind) {
                        debug!(%kind, "commit became empty, skipping");
                        status = git::skip_op(self.tree, kind)?;
                        continue;
                    }
                    // Operation already finished; nothing left to step
                    return Ok(skips);
                }

                StepStatus::Conflict => {
                    if summary.resolution_passes >= self.policy.max_passes {
                        warn!(
                            passes = summary.resolution_passes,
                            "resolution budget exhausted, aborting {}", kind
                        );
                        git::abort_op(self.tree, kind)?;
                        return Err(DriverError::ResolutionBudgetExceeded {
                            passes: summary.resolution_passes,
                        });
                    }
                    summary.resolution_passes += 1;

                    let remaining = match self.resolve_pass() {
                        Ok(remaining) => remaining,
                        Err(e) => {
                            git::abort_op(self.tree, kind)?;
                            return Err(e);
                        }
                    };
                    if !remaining.is_empty() {
                        git::abort_op(self.tree, kind)?;
                        return Err(DriverError::UnresolvedConflicts { paths: remaining });
                    }

                    status = git::continue_op(self.tree, kind)?;
                }

                StepStatus::Fatal(message) => {
                    if git::operation_in_progress(self.tree, kind) {
                        git::abort_op(self.tree, kind)?;
                    }
                    return Err(DriverError::StepFailed { kind, message });
                }
            }
        }
    }

    /// One resolution pass over the currently conflicted paths.
    ///
    /// The changelog is merged keeping both sides and is staged only when
    /// markers were actually merged; every other path takes the configured
    /// side. Returns the paths still unmerged afterwards, which the caller
    /// treats as unresolvable.
    fn resolve_pass(&self) -> Result<Vec<String>, DriverError> {
        let paths = git::unmerged_paths(self.tree)?;
        debug!(?paths, "resolving conflicted paths");

        for path in &paths {
            if *path == self.policy.changelog_path {
                match resolve::resolve_changelog_file(self.tree.root(), path, self.policy.order)? {
                    ChangelogOutcome::Merged => git::stage_path(self.tree, path)?,
                    outcome @ (ChangelogOutcome::Absent | ChangelogOutcome::NoMarkers) => {
                        // Left unstaged: ends up in the remaining set below
                        warn!(path, ?outcome, "changelog could not be merged");
                    }
                }
            } else {
                git::take_side(self.tree, path, self.policy.side)?;
            }
        }

        Ok(git::unmerged_paths(self.tree)?)
    }
}
