//! Git operations wrapper
//!
//! All mutations shell out to the `git` CLI; git2 (libgit2 bindings) is used
//! only to discover the working tree and read refs.

pub mod branch;
pub mod cleanup;
pub mod conflicts;
pub mod remote;
pub mod step;

pub use branch::*;
pub use cleanup::*;
pub use conflicts::*;
pub use remote::*;
pub use step::*;

use git2::Repository;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during git operations
#[derive(Error, Debug)]
pub enum GitError {
    #[error("Not a git repository: {0}")]
    NotARepo(String),

    #[error("Branch not found: {0}")]
    BranchNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Operation failed: {0}")]
    OperationFailed(String),

    #[error("Reference error: {0}")]
    Reference(String),
}

/// Handle to one physical checkout.
///
/// Every git operation in this crate takes a `&WorkingTree` instead of a bare
/// path or relying on the process working directory. Exclusive-access
/// contract: at most one `WorkingTree` may drive operations against a given
/// `.git` directory at a time. Rebases and cherry-picks are inherently
/// exclusive, and the driver assumes nothing else mutates the checkout
/// between its steps.
pub struct WorkingTree {
    repo: Repository,
    root: PathBuf,
}

impl WorkingTree {
    /// Open the working tree at `path`.
    ///
    /// Fails for paths that are not a git repository or that point at a bare
    /// repository (there is no checkout to operate on).
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, GitError> {
        let path = path.as_ref();
        let repo = Repository::open(path)
            .map_err(|e| GitError::NotARepo(format!("{}: {}", path.display(), e)))?;
        let root = repo
            .workdir()
            .ok_or_else(|| {
                GitError::NotARepo(format!(
                    "{}: bare repository has no working tree",
                    path.display()
                ))
            })?
            .to_path_buf();
        Ok(Self { repo, root })
    }

    /// Root of the checkout (where tracked files live).
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The `.git` directory backing this checkout.
    /// Correct for worktrees too, where `.git` is a file pointing elsewhere.
    pub fn git_dir(&self) -> &Path {
        self.repo.path()
    }

    /// Get the current branch name
    pub fn current_branch(&self) -> Result<String, GitError> {
        let head = self
            .repo
            .head()
            .map_err(|e| GitError::Reference(e.to_string()))?;

        if head.is_branch() {
            let name = head.shorthand().unwrap_or("HEAD");
            Ok(name.to_string())
        } else {
            // Detached HEAD
            let oid = head
                .target()
                .ok_or_else(|| GitError::Reference("HEAD has no target".to_string()))?;
            Ok(format!("(HEAD detached at {})", &oid.to_string()[..7]))
        }
    }
}
