//! wiremock-based mock helpers for GitHub API tests.
//!
//! octocrab deserializes into strict model types, so even a test response has
//! to carry the full complement of fields GitHub serves, `*_url` boilerplate
//! included. The builders here patch canned JSON templates instead of
//! assembling objects field by field: a test overrides only what it cares
//! about (PR number, state, head branch, fork clone URL) and everything else
//! stays fixed placeholder data that nothing reads.

use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shepr::platform::GitHubClient;

/// Start a wiremock server and configure GITHUB_TOKEN env var.
/// Returns the server and a GitHubClient pointed at it.
pub async fn setup_github_mock() -> (MockServer, GitHubClient) {
    let server = MockServer::start().await;
    // Set token so get_token() succeeds without gh CLI
    unsafe {
        std::env::set_var("GITHUB_TOKEN", "mock-test-token");
    }
    let client = GitHubClient::new(Some(&server.uri()));
    (server, client)
}

/// User object shaped for octocrab's `Author` model.
const USER_TEMPLATE: &str = r#"{
  "login": "octocat",
  "id": 1,
  "node_id": "MDQ6VXNlcjEx",
  "avatar_url": "https://avatars.githubusercontent.com/u/1?v=4",
  "gravatar_id": "",
  "url": "https://api.github.com/users/octocat",
  "html_url": "https://github.com/octocat",
  "followers_url": "https://api.github.com/users/octocat/followers",
  "following_url": "https://api.github.com/users/octocat/following{/other_user}",
  "gists_url": "https://api.github.com/users/octocat/gists{/gist_id}",
  "starred_url": "https://api.github.com/users/octocat/starred{/owner}{/repo}",
  "subscriptions_url": "https://api.github.com/users/octocat/subscriptions",
  "organizations_url": "https://api.github.com/users/octocat/orgs",
  "repos_url": "https://api.github.com/users/octocat/repos",
  "events_url": "https://api.github.com/users/octocat/events{/privacy}",
  "received_events_url": "https://api.github.com/users/octocat/received_events",
  "type": "User",
  "site_admin": false
}"#;

/// Repository object shaped for octocrab's `Repository` model. The `owner`
/// key is a placeholder patched by [`github_repo_json`].
const REPO_TEMPLATE: &str = r#"{
  "id": 1,
  "node_id": "MDEwOlJlcG9zaXRvcnkx",
  "name": "repo",
  "full_name": "owner/repo",
  "private": false,
  "owner": null,
  "html_url": "https://github.com/owner/repo",
  "description": null,
  "fork": false,
  "url": "https://api.github.com/repos/owner/repo",
  "forks_url": "https://api.github.com/repos/owner/repo/forks",
  "keys_url": "https://api.github.com/repos/owner/repo/keys{/key_id}",
  "collaborators_url": "https://api.github.com/repos/owner/repo/collaborators{/collaborator}",
  "teams_url": "https://api.github.com/repos/owner/repo/teams",
  "hooks_url": "https://api.github.com/repos/owner/repo/hooks",
  "issue_events_url": "https://api.github.com/repos/owner/repo/issues/events{/number}",
  "events_url": "https://api.github.com/repos/owner/repo/events",
  "assignees_url": "https://api.github.com/repos/owner/repo/assignees{/user}",
  "branches_url": "https://api.github.com/repos/owner/repo/branches{/branch}",
  "tags_url": "https://api.github.com/repos/owner/repo/tags",
  "blobs_url": "https://api.github.com/repos/owner/repo/git/blobs{/sha}",
  "git_tags_url": "https://api.github.com/repos/owner/repo/git/tags{/sha}",
  "git_refs_url": "https://api.github.com/repos/owner/repo/git/refs{/sha}",
  "trees_url": "https://api.github.com/repos/owner/repo/git/trees{/sha}",
  "statuses_url": "https://api.github.com/repos/owner/repo/statuses/{sha}",
  "languages_url": "https://api.github.com/repos/owner/repo/languages",
  "stargazers_url": "https://api.github.com/repos/owner/repo/stargazers",
  "contributors_url": "https://api.github.com/repos/owner/repo/contributors",
  "subscribers_url": "https://api.github.com/repos/owner/repo/subscribers",
  "subscription_url": "https://api.github.com/repos/owner/repo/subscription",
  "commits_url": "https://api.github.com/repos/owner/repo/commits{/sha}",
  "git_commits_url": "https://api.github.com/repos/owner/repo/git/commits{/sha}",
  "comments_url": "https://api.github.com/repos/owner/repo/comments{/number}",
  "issue_comment_url": "https://api.github.com/repos/owner/repo/issues/comments{/number}",
  "contents_url": "https://api.github.com/repos/owner/repo/contents/{+path}",
  "compare_url": "https://api.github.com/repos/owner/repo/compare/{base}...{head}",
  "merges_url": "https://api.github.com/repos/owner/repo/merges",
  "archive_url": "https://api.github.com/repos/owner/repo/{archive_format}{/ref}",
  "downloads_url": "https://api.github.com/repos/owner/repo/downloads",
  "issues_url": "https://api.github.com/repos/owner/repo/issues{/number}",
  "pulls_url": "https://api.github.com/repos/owner/repo/pulls{/number}",
  "milestones_url": "https://api.github.com/repos/owner/repo/milestones{/number}",
  "notifications_url": "https://api.github.com/repos/owner/repo/notifications{?since,all,participating}",
  "labels_url": "https://api.github.com/repos/owner/repo/labels{/name}",
  "releases_url": "https://api.github.com/repos/owner/repo/releases{/id}",
  "deployments_url": "https://api.github.com/repos/owner/repo/deployments",
  "created_at": "2024-01-01T00:00:00Z",
  "updated_at": "2024-01-01T00:00:00Z",
  "pushed_at": "2024-01-01T00:00:00Z",
  "git_url": "git://github.com/owner/repo.git",
  "ssh_url": "git@github.com:owner/repo.git",
  "clone_url": "https://github.com/owner/repo.git",
  "svn_url": "https://github.com/owner/repo",
  "homepage": null,
  "size": 0,
  "stargazers_count": 0,
  "watchers_count": 0,
  "language": "Rust",
  "has_issues": true,
  "has_projects": true,
  "has_downloads": true,
  "has_wiki": true,
  "has_pages": false,
  "forks_count": 0,
  "mirror_url": null,
  "archived": false,
  "disabled": false,
  "open_issues_count": 0,
  "license": null,
  "forks": 0,
  "open_issues": 0,
  "watchers": 0,
  "default_branch": "main"
}"#;

/// Pull request object shaped for octocrab's `PullRequest` model. The `head`,
/// `base`, and `user` keys are placeholders patched by [`github_pr_json`].
const PR_TEMPLATE: &str = r#"{
  "id": 0,
  "number": 0,
  "node_id": "PR_0",
  "state": "open",
  "title": "Test PR",
  "html_url": "https://github.com/owner/repo/pull/0",
  "diff_url": "https://github.com/owner/repo/pull/0.diff",
  "patch_url": "https://github.com/owner/repo/pull/0.patch",
  "issue_url": "https://api.github.com/repos/owner/repo/issues/0",
  "commits_url": "https://api.github.com/repos/owner/repo/pulls/0/commits",
  "review_comments_url": "https://api.github.com/repos/owner/repo/pulls/0/comments",
  "review_comment_url": "https://api.github.com/repos/owner/repo/pulls/comments{/number}",
  "comments_url": "https://api.github.com/repos/owner/repo/issues/0/comments",
  "statuses_url": "https://api.github.com/repos/owner/repo/statuses/abc123def456",
  "url": "https://api.github.com/repos/owner/repo/pulls/0",
  "head": null,
  "base": null,
  "user": null,
  "body": "Test PR body",
  "draft": false,
  "locked": false,
  "merged": false,
  "merged_at": null,
  "mergeable": true,
  "mergeable_state": "clean",
  "merge_commit_sha": null,
  "created_at": "2024-01-01T00:00:00Z",
  "updated_at": "2024-01-15T10:30:00Z",
  "closed_at": null,
  "labels": [],
  "milestone": null,
  "assignee": null,
  "assignees": [],
  "requested_reviewers": [],
  "requested_teams": [],
  "active_lock_reason": null
}"#;

fn github_user_json(login: &str, id: u64) -> Value {
    let mut user: Value = serde_json::from_str(USER_TEMPLATE).expect("static user template");
    user["login"] = json!(login);
    user["id"] = json!(id);
    user
}

fn github_repo_json(owner: &str, repo: &str) -> Value {
    let mut r: Value = serde_json::from_str(REPO_TEMPLATE).expect("static repo template");
    r["name"] = json!(repo);
    r["full_name"] = json!(format!("{}/{}", owner, repo));
    r["owner"] = github_user_json(owner, 1);
    r["clone_url"] = json!(format!("https://github.com/{}/{}.git", owner, repo));
    r
}

/// Complete GitHub PR JSON response that octocrab can deserialize.
///
/// The head repository belongs to `head_owner` and advertises
/// `head_clone_url`, so tests can point the PR head at a local fixture fork.
pub fn github_pr_json(
    number: u64,
    state: &str,
    merged: bool,
    head_owner: &str,
    head_branch: &str,
    head_clone_url: &str,
) -> Value {
    let mut pr: Value = serde_json::from_str(PR_TEMPLATE).expect("static PR template");
    pr["id"] = json!(number);
    pr["number"] = json!(number);
    pr["node_id"] = json!(format!("PR_{}", number));
    pr["html_url"] = json!(format!("https://github.com/owner/repo/pull/{}", number));
    pr["url"] = json!(format!(
        "https://api.github.com/repos/owner/repo/pulls/{}",
        number
    ));
    pr["state"] = json!(state);
    pr["merged"] = json!(merged);
    pr["mergeable"] = json!(!merged);
    if merged {
        pr["merged_at"] = json!("2024-01-02T00:00:00Z");
        pr["merge_commit_sha"] = json!("c0ffee123456");
    }
    if state == "closed" || merged {
        pr["closed_at"] = json!("2024-01-02T00:00:00Z");
    }

    let mut head_repo = github_repo_json(head_owner, "repo");
    head_repo["clone_url"] = json!(head_clone_url);
    head_repo["fork"] = json!(true);
    pr["head"] = json!({
        "ref": head_branch,
        "sha": "abc123def456",
        "label": format!("{}:{}", head_owner, head_branch),
        "repo": head_repo,
        "user": github_user_json(head_owner, 2)
    });
    pr["base"] = json!({
        "ref": "main",
        "sha": "def456abc123",
        "label": "owner:main",
        "repo": github_repo_json("owner", "repo"),
        "user": github_user_json("owner", 1)
    });
    pr["user"] = github_user_json(head_owner, 2);
    pr
}

/// GitHub API response for getting a PR (GET /repos/:owner/:repo/pulls/:number)
/// with a default fork head (`forker:feat/test`).
pub async fn mock_get_pr(server: &MockServer, number: u64, state: &str, merged: bool) {
    let body = github_pr_json(
        number,
        state,
        merged,
        "forker",
        "feat/test",
        "https://github.com/forker/repo.git",
    );
    mock_get_pr_json(server, number, body).await;
}

/// Mount an arbitrary PR body for GET /repos/owner/repo/pulls/:number.
pub async fn mock_get_pr_json(server: &MockServer, number: u64, body: Value) {
    Mock::given(method("GET"))
        .and(path(format!("/repos/owner/repo/pulls/{}", number)))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// GitHub API response for listing PR commits
/// (GET /repos/:owner/:repo/pulls/:number/commits).
pub async fn mock_list_commits(server: &MockServer, number: u64, shas: &[&str]) {
    let items: Vec<Value> = shas
        .iter()
        .map(|sha| {
            json!({
                "sha": sha,
                "node_id": format!("C_{}", sha),
                "commit": {
                    "message": "Test commit",
                    "author": {
                        "name": "Test User",
                        "email": "test@example.com",
                        "date": "2024-01-01T00:00:00Z"
                    }
                },
                "url": format!("https://api.github.com/repos/owner/repo/commits/{}", sha),
                "html_url": format!("https://github.com/owner/repo/commit/{}", sha),
                "parents": []
            })
        })
        .collect();

    Mock::given(method("GET"))
        .and(path(format!("/repos/owner/repo/pulls/{}/commits", number)))
        .respond_with(ResponseTemplate::new(200).set_body_json(items))
        .mount(server)
        .await;
}

/// GitHub API response for the issue search endpoint (GET /search/issues),
/// returning open PRs with the given numbers.
pub async fn mock_search_issues(server: &MockServer, numbers: &[u64]) {
    let items: Vec<Value> = numbers
        .iter()
        .map(|n| {
            json!({
                "number": n,
                "title": format!("Test PR {}", n),
                "state": "open",
                "html_url": format!("https://github.com/owner/repo/pull/{}", n),
                "pull_request": {
                    "url": format!("https://api.github.com/repos/owner/repo/pulls/{}", n)
                },
                "labels": [{"name": "backport"}]
            })
        })
        .collect();

    let body = json!({
        "total_count": items.len(),
        "incomplete_results": false,
        "items": items
    });

    Mock::given(method("GET"))
        .and(path("/search/issues"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Mount an error status with a GitHub-style body for any GET to `path_str`.
async fn mock_error(server: &MockServer, path_str: &str, status: u16, message: &str) {
    let body = json!({
        "message": message,
        "documentation_url": "https://docs.github.com/rest"
    });

    Mock::given(method("GET"))
        .and(path(path_str))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(server)
        .await;
}

/// Mock a 404 response for any GET to a specific path.
pub async fn mock_not_found(server: &MockServer, path_str: &str) {
    mock_error(server, path_str, 404, "Not Found").await;
}

/// Mock a server error (500).
pub async fn mock_server_error(server: &MockServer, path_str: &str) {
    mock_error(server, path_str, 500, "Internal Server Error").await;
}
