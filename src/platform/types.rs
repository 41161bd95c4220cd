//! Normalized pull request types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Pull request state.
///
/// GitHub reports merged PRs as `closed`; the client promotes them to
/// `Merged` when a merge timestamp is present, since the two commands treat
/// merged and abandoned PRs very differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PRState {
    #[default]
    Open,
    Closed,
    Merged,
}

impl std::fmt::Display for PRState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            PRState::Open => "open",
            PRState::Closed => "closed",
            PRState::Merged => "merged",
        })
    }
}

/// PR head reference information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PRHead {
    /// Branch reference name
    #[serde(rename = "ref")]
    pub ref_name: String,
    /// Commit SHA
    pub sha: String,
    /// Owner of the repository the head branch lives in (the fork owner for
    /// fork PRs, otherwise the base repository owner)
    pub owner: String,
    /// Clone URL of the repository the head branch lives in
    pub clone_url: String,
}

/// PR base reference information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PRBase {
    /// Branch reference name
    #[serde(rename = "ref")]
    pub ref_name: String,
}

/// Normalized pull request data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequest {
    /// PR number
    pub number: u64,
    /// PR URL
    pub url: String,
    /// PR title
    pub title: String,
    /// PR state
    pub state: PRState,
    /// Head branch info
    pub head: PRHead,
    /// Base branch info
    pub base: PRBase,
    /// When the PR was last updated
    pub updated_at: Option<DateTime<Utc>>,
}
