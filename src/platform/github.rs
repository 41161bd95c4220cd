//! GitHub API client built on octocrab

use once_cell::sync::Lazy;
use octocrab::models::IssueState;
use octocrab::Octocrab;
use regex::Regex;
use serde::Deserialize;
use tracing::debug;

use super::types::{PRBase, PRHead, PRState, PullRequest};
use super::PlatformError;

static SHA_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9a-f]{7,40}$").expect("hardcoded regex must be valid"));

/// GitHub API client
pub struct GitHubClient {
    /// Custom API base URL (GitHub Enterprise or a test server).
    /// `None` means api.github.com.
    base_url: Option<String>,
}

impl GitHubClient {
    pub fn new(base_url: Option<&str>) -> Self {
        Self {
            base_url: base_url.map(|u| u.trim_end_matches('/').to_string()),
        }
    }

    /// Get GitHub token from environment or gh CLI
    pub async fn get_token() -> Result<String, PlatformError> {
        // Try environment variables first
        for var in ["GITHUB_TOKEN", "GH_TOKEN"] {
            if let Ok(token) = std::env::var(var) {
                if !token.is_empty() {
                    return Ok(token);
                }
            }
        }

        // Fall back to a token minted by a logged-in gh CLI
        let output = tokio::process::Command::new("gh")
            .args(["auth", "token"])
            .output()
            .await
            .map_err(|e| PlatformError::AuthError(format!("Could not invoke gh: {}", e)))?;

        if output.status.success() {
            let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
            if !token.is_empty() {
                return Ok(token);
            }
        }

        Err(PlatformError::AuthError(
            "No GitHub token found. Set GITHUB_TOKEN or GH_TOKEN, or log in with 'gh auth login'"
                .to_string(),
        ))
    }

    /// Get configured Octocrab instance
    async fn get_client(&self) -> Result<Octocrab, PlatformError> {
        let token = Self::get_token().await?;

        let mut builder = Octocrab::builder().personal_token(token);

        if let Some(ref base_url) = self.base_url {
            builder = builder
                .base_uri(base_url)
                .map_err(|e| PlatformError::ApiError(format!("Invalid base URL: {}", e)))?;
        }

        builder
            .build()
            .map_err(|e| PlatformError::ApiError(format!("Failed to create client: {}", e)))
    }

    fn api_base(&self) -> &str {
        self.base_url.as_deref().unwrap_or("https://api.github.com")
    }

    /// Fetch one pull request
    pub async fn get_pull_request(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<PullRequest, PlatformError> {
        let client = self.get_client().await?;

        let pr = client
            .pulls(owner, repo)
            .get(number)
            .await
            .map_err(|e| map_octocrab_error(e, &format!("PR #{} in {}/{}", number, owner, repo)))?;

        // merged_at is the reliable signal; the state field stays "closed"
        // for merged PRs
        let state = if pr.merged_at.is_some() {
            PRState::Merged
        } else {
            match pr.state {
                Some(IssueState::Open) => PRState::Open,
                _ => PRState::Closed,
            }
        };

        let head_repo = pr.head.repo.ok_or_else(|| {
            PlatformError::ParseError(format!(
                "PR #{} head repository is unavailable (fork deleted?)",
                number
            ))
        })?;
        let clone_url = head_repo.clone_url.ok_or_else(|| {
            PlatformError::ParseError(format!("PR #{} head repository has no clone URL", number))
        })?;
        let head_owner = head_repo.owner.ok_or_else(|| {
            PlatformError::ParseError(format!("PR #{} head repository has no owner", number))
        })?;

        Ok(PullRequest {
            number: pr.number,
            url: pr
                .html_url
                .map(|u| u.to_string())
                .unwrap_or_else(|| format!("https://github.com/{}/{}/pull/{}", owner, repo, number)),
            title: pr.title.unwrap_or_default(),
            state,
            head: PRHead {
                ref_name: pr.head.ref_field,
                sha: pr.head.sha,
                owner: head_owner.login,
                clone_url: clone_url.to_string(),
            },
            base: PRBase {
                ref_name: pr.base.ref_field,
            },
            updated_at: pr.updated_at,
        })
    }

    /// List the commit SHAs on a PR, oldest first.
    ///
    /// Hits the REST endpoint directly; the SHA is all the cherry-pick needs.
    pub async fn list_commit_shas(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<Vec<String>, PlatformError> {
        #[derive(Deserialize)]
        struct CommitEntry {
            sha: String,
        }

        let token = Self::get_token().await?;
        let url = format!(
            "{}/repos/{}/{}/pulls/{}/commits?per_page=100",
            self.api_base(),
            owner,
            repo,
            number
        );
        debug!(%url, "fetching PR commits");

        let response = reqwest::Client::new()
            .get(&url)
            .header("Authorization", format!("Bearer {}", token))
            .header("Accept", "application/vnd.github.v3+json")
            .header("User-Agent", "shepr")
            .send()
            .await
            .map_err(|e| PlatformError::NetworkError(e.to_string()))?;

        check_status(&response, &format!("commits of PR #{}", number))?;

        let entries: Vec<CommitEntry> = response
            .json()
            .await
            .map_err(|e| PlatformError::ParseError(e.to_string()))?;

        let mut shas = Vec::with_capacity(entries.len());
        for entry in entries {
            if !SHA_RE.is_match(&entry.sha) {
                return Err(PlatformError::ParseError(format!(
                    "Commit list for PR #{} contains invalid SHA '{}'",
                    number, entry.sha
                )));
            }
            shas.push(entry.sha);
        }
        Ok(shas)
    }

    /// Find open PRs carrying a label, as PR numbers in ascending order
    pub async fn search_prs_by_label(
        &self,
        owner: &str,
        repo: &str,
        label: &str,
    ) -> Result<Vec<u64>, PlatformError> {
        #[derive(Deserialize)]
        struct SearchResults {
            items: Vec<SearchItem>,
        }
        #[derive(Deserialize)]
        struct SearchItem {
            number: u64,
        }

        let token = Self::get_token().await?;
        let query = format!("repo:{}/{} is:pr is:open label:\"{}\"", owner, repo, label);
        let url = format!(
            "{}/search/issues?q={}",
            self.api_base(),
            urlencoding::encode(&query)
        );
        debug!(%url, "searching for labelled PRs");

        let response = reqwest::Client::new()
            .get(&url)
            .header("Authorization", format!("Bearer {}", token))
            .header("Accept", "application/vnd.github.v3+json")
            .header("User-Agent", "shepr")
            .send()
            .await
            .map_err(|e| PlatformError::NetworkError(e.to_string()))?;

        check_status(&response, &format!("search for label '{}'", label))?;

        let results: SearchResults = response
            .json()
            .await
            .map_err(|e| PlatformError::ParseError(e.to_string()))?;

        let mut numbers: Vec<u64> = results.items.into_iter().map(|i| i.number).collect();
        numbers.sort_unstable();
        Ok(numbers)
    }
}

fn check_status(response: &reqwest::Response, context: &str) -> Result<(), PlatformError> {
    let status = response.status();
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(PlatformError::NotFound(context.to_string()));
    }
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return Err(PlatformError::AuthError(format!(
            "GitHub API denied access to {} ({})",
            context, status
        )));
    }
    if !status.is_success() {
        return Err(PlatformError::ApiError(format!(
            "GitHub API returned {} for {}",
            status, context
        )));
    }
    Ok(())
}

fn map_octocrab_error(e: octocrab::Error, context: &str) -> PlatformError {
    match &e {
        octocrab::Error::GitHub { source, .. } => match source.status_code.as_u16() {
            404 => PlatformError::NotFound(context.to_string()),
            401 | 403 => PlatformError::AuthError(format!(
                "GitHub API denied access to {} ({})",
                context, source.status_code
            )),
            _ => PlatformError::ApiError(format!("{}: {}", context, source.message)),
        },
        _ => PlatformError::NetworkError(e.to_string()),
    }
}
