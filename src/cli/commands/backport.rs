//! Backport command implementation
//!
//! Cherry-picks merged pull requests onto a release branch and pushes the
//! resulting backport branch to origin.

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;
use tracing::{debug, warn};

use crate::cli::output::Output;
use crate::config::{
    BotIdentity, FileConfig, DEFAULT_BACKPORT_LABEL, DEFAULT_CHANGELOG,
};
use crate::driver::{DriveSummary, Driver, Operation, ResolutionPolicy, DEFAULT_MAX_PASSES};
use crate::git::{self, ConflictSide, WorkingTree};
use crate::platform::{GitHubClient, PRState};
use crate::resolve::BlockOrder;

/// Arguments for the backport command
#[derive(Args, Debug)]
pub struct BackportArgs {
    /// Repository owner (user or organization)
    pub owner: String,

    /// Repository name
    pub repo: String,

    /// Path to a local checkout of the repository
    pub path: PathBuf,

    /// PR number to backport
    #[arg(long, conflicts_with = "label")]
    pub pr: Option<u64>,

    /// Backport every PR carrying this label [default: backport]
    #[arg(long)]
    pub label: Option<String>,

    /// Release branch to backport onto (required unless set in config)
    #[arg(long)]
    pub target: Option<String>,

    /// Changelog path relative to the checkout root [default: CHANGELOG.md]
    #[arg(long)]
    pub changelog: Option<String>,

    /// Order of merged changelog blocks
    #[arg(long, value_enum)]
    pub order: Option<BlockOrder>,

    /// Side taken for non-changelog conflicts
    #[arg(long, value_enum)]
    pub side: Option<ConflictSide>,

    /// Config file [default: .shepr.yaml at the checkout root]
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// GitHub API base URL (for GitHub Enterprise)
    #[arg(long, env = "GITHUB_API_URL")]
    pub api_url: Option<String>,

    /// Fall back to a plain force push when the lease-protected push is
    /// rejected
    #[arg(long)]
    pub force: bool,

    /// Skip confirmation prompts
    #[arg(short = 'y', long)]
    pub yes: bool,
}

enum BackportOutcome {
    Backported {
        branch: String,
        summary: DriveSummary,
    },
    /// PR was not merged yet (or closed without merging)
    Skipped(PRState),
    /// Every commit was already present on the release branch
    NothingToApply(usize),
}

/// Run the backport command
pub async fn run(args: BackportArgs) -> Result<()> {
    which::which("git").context("git is not installed or not on PATH")?;

    let file_cfg = FileConfig::load_optional(&args.path, args.config.as_deref())
        .context("Failed to load config")?;

    let Some(target) = args.target.clone().or(file_cfg.target) else {
        bail!("--target is required: name the release branch to backport onto");
    };
    let policy = ResolutionPolicy {
        changelog_path: args
            .changelog
            .clone()
            .or(file_cfg.changelog)
            .unwrap_or_else(|| DEFAULT_CHANGELOG.to_string()),
        order: args.order.or(file_cfg.order).unwrap_or_default(),
        side: args.side.or(file_cfg.side).unwrap_or_default(),
        max_passes: file_cfg.max_resolve_passes.unwrap_or(DEFAULT_MAX_PASSES),
    };
    let bot = file_cfg.bot.unwrap_or_default();
    let label = args
        .label
        .clone()
        .or(file_cfg.label)
        .unwrap_or_else(|| DEFAULT_BACKPORT_LABEL.to_string());

    // Fail fast on missing credentials before touching the checkout
    GitHubClient::get_token().await?;
    let client = GitHubClient::new(args.api_url.as_deref());

    let tree = WorkingTree::open(&args.path)
        .with_context(|| format!("Failed to open repository at {}", args.path.display()))?;

    let candidates: Vec<u64> = match args.pr {
        Some(number) => vec![number],
        None => {
            let numbers = client
                .search_prs_by_label(&args.owner, &args.repo, &label)
                .await
                .context("Failed to search for labelled PRs")?;
            if numbers.is_empty() {
                Output::info(&format!(
                    "No open PRs in {}/{} with label '{}'",
                    args.owner, args.repo, label
                ));
                return Ok(());
            }
            numbers
        }
    };

    Output::header(&format!(
        "Backporting {} pull request(s) in {} onto {}",
        candidates.len(),
        Output::repo_name(&format!("{}/{}", args.owner, args.repo)),
        Output::branch_name(&target)
    ));
    println!();

    let mut success_count = 0;
    let mut skip_count = 0;
    let mut failed: Vec<(u64, String)> = Vec::new();

    for number in candidates {
        let spinner = Output::spinner(&format!("PR #{}: backporting onto {}...", number, target));

        match backport_one(&client, &tree, &args, &target, &policy, &bot, number).await {
            Ok(BackportOutcome::Backported { branch, summary }) => {
                success_count += 1;
                spinner.finish_with_message(backported_message(number, &branch, &summary));
            }
            Ok(BackportOutcome::Skipped(state)) => {
                skip_count += 1;
                spinner.finish_with_message(format!(
                    "{} PR #{} skipped (state: {}, backports want merged PRs)",
                    "⚠".yellow(),
                    number,
                    Output::status(&state.to_string())
                ));
            }
            Ok(BackportOutcome::NothingToApply(count)) => {
                skip_count += 1;
                spinner.finish_with_message(format!(
                    "{} PR #{}: all {} commit(s) already on {}, nothing pushed",
                    "⚠".yellow(),
                    number,
                    count,
                    target
                ));
            }
            Err(e) => {
                spinner.finish_with_message(format!("{} PR #{} failed", "✗".red(), number));
                failed.push((number, format!("{:#}", e)));
            }
        }

        // Whatever happened, never leave a half-done operation behind
        if let Err(e) = git::restore_clean_state(&tree) {
            warn!(number, error = %e, "failed to restore clean state");
        }
    }

    println!();
    if failed.is_empty() {
        Output::success(&format!(
            "Backported {} pull request(s){}",
            success_count,
            if skip_count > 0 {
                format!(", {} skipped", skip_count)
            } else {
                String::new()
            }
        ));
    } else {
        Output::warning(&format!(
            "{} backported, {} failed, {} skipped",
            success_count,
            failed.len(),
            skip_count
        ));
        for (number, reason) in &failed {
            Output::error(&format!("PR #{}: {}", number, reason));
        }
        bail!("{} pull request(s) failed", failed.len());
    }

    Ok(())
}

fn backported_message(number: u64, branch: &str, summary: &DriveSummary) -> String {
    let mut message = format!(
        "{} PR #{} → {} ({} commit(s) applied",
        "✓".green(),
        number,
        Output::branch_name(branch),
        summary.applied
    );
    if summary.skipped > 0 {
        message.push_str(&format!(", {} skipped", summary.skipped));
    }
    message.push(')');
    message
}

async fn backport_one(
    client: &GitHubClient,
    tree: &WorkingTree,
    args: &BackportArgs,
    target: &str,
    policy: &ResolutionPolicy,
    bot: &BotIdentity,
    number: u64,
) -> Result<BackportOutcome> {
    let pr = client
        .get_pull_request(&args.owner, &args.repo, number)
        .await
        .with_context(|| format!("Failed to fetch PR #{}", number))?;

    if pr.state != PRState::Merged {
        return Ok(BackportOutcome::Skipped(pr.state));
    }

    let commits = client
        .list_commit_shas(&args.owner, &args.repo, number)
        .await
        .with_context(|| format!("Failed to list commits of PR #{}", number))?;
    if commits.is_empty() {
        bail!("PR #{} has no commits", number);
    }
    debug!(number, count = commits.len(), "backporting PR commits");

    git::restore_clean_state(tree)?;
    git::ensure_identity(tree, &bot.name, &bot.email)?;

    // Refresh the release branch, and make sure the PR's commits are
    // reachable locally. pull/<n>/head keeps working after a squash merge,
    // when the original commits exist nowhere else.
    git::fetch(tree, "origin", target)?;
    git::fetch(tree, "origin", &format!("pull/{}/head", number))?;

    let branch = format!("backport-pr-{}-{}", number, target);
    git::create_branch_from(tree, &branch, &format!("origin/{}", target))?;

    let driver = Driver::new(tree, policy.clone());
    let summary = driver.run(&Operation::CherryPick {
        commits: commits.clone(),
    })?;

    if summary.applied == 0 {
        return Ok(BackportOutcome::NothingToApply(summary.skipped));
    }

    // An aborted-and-restarted operation can leave HEAD detached
    git::ensure_on_branch(tree, &branch)?;

    push_backport_branch(tree, args, &branch)?;

    Ok(BackportOutcome::Backported { branch, summary })
}

/// Push the backport branch to origin, falling back to a plain force push
/// only when allowed and confirmed.
fn push_backport_branch(tree: &WorkingTree, args: &BackportArgs, branch: &str) -> Result<()> {
    let refspec = format!("{}:{}", branch, branch);

    match git::push_with_lease(tree, "origin", &refspec) {
        Ok(()) => Ok(()),
        Err(e) if args.force => {
            warn!(error = %e, "lease-protected push rejected, falling back to --force");
            if !args.yes {
                let confirmed = dialoguer::Confirm::new()
                    .with_prompt(format!("Force push {} to origin?", branch))
                    .default(false)
                    .interact()?;
                if !confirmed {
                    bail!("Force push declined");
                }
            }
            git::force_push(tree, "origin", &refspec)?;
            Ok(())
        }
        Err(e) => Err(e).context("Push rejected; re-run with --force to overwrite"),
    }
}
