//! GitHub API access
//!
//! Read-only: the crate queries PR metadata, commit lists, and label
//! searches, and never mutates anything through the API. All writes happen
//! over the git protocol.

pub mod github;
pub mod types;

pub use github::GitHubClient;
pub use types::{PRBase, PRHead, PRState, PullRequest};

use thiserror::Error;

/// Errors from platform API operations
#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Failed to parse response: {0}")]
    ParseError(String),
}
