//! Test fixtures for pull-request maintenance scenarios.
//!
//! Builds a self-contained git topology, entirely offline: a bare upstream
//! (`origin.git`), a bare fork (`fork.git`) where PR head branches live, a
//! working clone that commands operate in, and a contributor clone used to
//! stage branches and push them around.

use std::path::PathBuf;
use tempfile::TempDir;

use super::git_helpers;

/// Changelog content seeded on `main`. Tests construct conflicts around the
/// `Unreleased` section.
pub const BASE_CHANGELOG: &str = "# Changelog\n\n## Unreleased\n\n- base entry\n";

/// A PR test environment with temporary directories cleaned up on drop.
pub struct PrFixture {
    /// The temporary directory holding all four repositories.
    /// Kept alive for the lifetime of the fixture.
    pub _temp: TempDir,
    /// Bare upstream repository (the working clone's `origin`).
    pub origin: PathBuf,
    /// Bare fork repository (where PR head branches are pushed).
    pub fork: PathBuf,
    /// Working clone of origin that commands run against.
    pub work: PathBuf,
    /// Contributor clone used to seed history and stage branches.
    pub contributor: PathBuf,
}

impl PrFixture {
    /// Create the topology and seed `main` with a README and changelog.
    pub fn new() -> Self {
        let temp = TempDir::new().expect("failed to create temp dir");
        let origin = temp.path().join("origin.git");
        let fork = temp.path().join("fork.git");
        let work = temp.path().join("work");
        let contributor = temp.path().join("contributor");

        git_helpers::init_bare_repo(&origin);
        git_helpers::init_bare_repo(&fork);

        let origin_url = format!("file://{}", origin.display());
        git_helpers::clone_repo(&origin_url, &contributor);
        git_helpers::commit_file(&contributor, "README.md", "# widgets\n", "Initial commit");
        git_helpers::commit_file(&contributor, "CHANGELOG.md", BASE_CHANGELOG, "Add changelog");
        git_helpers::push_branch(&contributor, "origin", "main");

        git_helpers::clone_repo(&origin_url, &work);

        Self {
            _temp: temp,
            origin,
            fork,
            work,
            contributor,
        }
    }

    /// The file:// URL of the bare upstream.
    pub fn origin_url(&self) -> String {
        format!("file://{}", self.origin.display())
    }

    /// The file:// URL of the bare fork.
    pub fn fork_url(&self) -> String {
        format!("file://{}", self.fork.display())
    }

    /// Advance origin's `main` with another commit. Returns the new sha.
    pub fn advance_main(&self, filename: &str, content: &str, message: &str) -> String {
        git_helpers::checkout(&self.contributor, "main");
        let sha = git_helpers::commit_file(&self.contributor, filename, content, message);
        git_helpers::push_branch(&self.contributor, "origin", "main");
        sha
    }

    /// Create `branch` in the contributor clone, starting from origin's
    /// current `main`. The caller adds commits, then pushes with
    /// [`push_to_fork`](Self::push_to_fork) or
    /// [`push_to_origin`](Self::push_to_origin).
    pub fn start_branch(&self, branch: &str) {
        git_helpers::checkout(&self.contributor, "main");
        git_helpers::git(&self.contributor, &["pull", "--ff-only", "origin", "main"]);
        git_helpers::create_branch(&self.contributor, branch);
    }

    /// Push the contributor's `branch` to the fork.
    pub fn push_to_fork(&self, branch: &str) {
        git_helpers::push_branch(&self.contributor, &self.fork_url(), branch);
    }

    /// Push the contributor's `branch` to origin.
    pub fn push_to_origin(&self, branch: &str) {
        git_helpers::push_branch(&self.contributor, "origin", branch);
    }

    /// Publish the contributor's `branch` as origin's `refs/pull/{number}/head`,
    /// mirroring the ref GitHub serves for a pull request. The branch itself is
    /// not pushed, so the commits are reachable only through the pull ref --
    /// the same shape a squash-merged fork PR leaves behind. Returns the tip sha.
    pub fn publish_pull_head(&self, number: u64, branch: &str) -> String {
        let sha = git_helpers::git_output(&self.contributor, &["rev-parse", branch]);
        git_helpers::push_branch(
            &self.contributor,
            "origin",
            &format!("{}:refs/pull/{}/head", branch, number),
        );
        sha
    }

    /// Tip sha of `branch` in the fork.
    pub fn fork_branch_sha(&self, branch: &str) -> String {
        git_helpers::git_output(&self.fork, &["rev-parse", &format!("refs/heads/{}", branch)])
    }
}
