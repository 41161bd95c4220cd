//! shepr: shepherds pull requests that fell behind
//!
//! Two maintenance chores, automated end to end:
//!
//! - **rebase**: take a stalled PR, rebase it onto the current target
//!   branch, resolve the conflicts it accumulated, and push the result back
//!   to the contributor's fork.
//! - **backport**: take a merged PR, cherry-pick its commits onto a release
//!   branch, and push the backport branch for review.
//!
//! Both run the same [`driver::Driver`] loop over a [`git::WorkingTree`];
//! they differ only in the operation driven and where the result is pushed.
//! Conflicts in the changelog are merged keeping both sides
//! ([`resolve::merge_conflict_markers`]); everything else takes a configured
//! side wholesale.

pub mod cli;
pub mod config;
pub mod driver;
pub mod git;
pub mod platform;
pub mod resolve;
pub mod util;
