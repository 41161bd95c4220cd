//! Rebase command implementation
//!
//! Rebases stalled pull requests onto a moving target branch and pushes the
//! result back to the contributor's fork.

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;
use tracing::{debug, warn};
use url::Url;

use crate::cli::output::Output;
use crate::config::{BotIdentity, FileConfig, DEFAULT_CHANGELOG, DEFAULT_TARGET};
use crate::driver::{DriveSummary, Driver, Operation, ResolutionPolicy, DEFAULT_MAX_PASSES};
use crate::git::{self, ConflictSide, WorkingTree};
use crate::platform::{GitHubClient, PRState, PullRequest};
use crate::resolve::BlockOrder;

/// Arguments for the rebase command
#[derive(Args, Debug)]
pub struct RebaseArgs {
    /// Repository owner (user or organization)
    pub owner: String,

    /// Repository name
    pub repo: String,

    /// Path to a local checkout of the repository
    pub path: PathBuf,

    /// PR number to rebase
    #[arg(long, conflicts_with = "label")]
    pub pr: Option<u64>,

    /// Rebase every open PR carrying this label instead of one number
    #[arg(long)]
    pub label: Option<String>,

    /// Branch to rebase onto [default: main]
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

enum RebaseOutcome {
    Rebased(DriveSummary),
    /// PR was not open
    Skipped(PRState),
}

/// Run the rebase command
pub async fn run(args: RebaseArgs) -> Result<()> {
    which::which("git").context("git is not installed or not on PATH")?;

    let file_cfg = FileConfig::load_optional(&args.path, args.config.as_deref())
        .context("Failed to load config")?;

    let target = args
        .target
        .clone()
        .or(file_cfg.target)
        .unwrap_or_else(|| DEFAULT_TARGET.to_string());
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
    let label = args.label.clone().or(file_cfg.label);

    if args.pr.is_none() && label.is_none() {
        bail!("Provide --pr or --label (or set `label` in .shepr.yaml)");
    }

    // Fail fast on missing credentials before touching the checkout
    GitHubClient::get_token().await?;
    let client = GitHubClient::new(args.api_url.as_deref());

    let tree = WorkingTree::open(&args.path)
        .with_context(|| format!("Failed to open repository at {}", args.path.display()))?;

    let candidates: Vec<u64> = match args.pr {
        Some(number) => vec![number],
        None => {
            let label = label.as_deref().unwrap_or_default();
            let numbers = client
                .search_prs_by_label(&args.owner, &args.repo, label)
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
        "Rebasing {} pull request(s) in {} onto {}",
        candidates.len(),
        Output::repo_name(&format!("{}/{}", args.owner, args.repo)),
        Output::branch_name(&target)
    ));
    println!();

    let mut success_count = 0;
    let mut skip_count = 0;
    let mut failed: Vec<(u64, String)> = Vec::new();

    for number in candidates {
        let spinner = Output::spinner(&format!("PR #{}: rebasing onto {}...", number, target));

        match rebase_one(&client, &tree, &args, &target, &policy, &bot, number).await {
            Ok(RebaseOutcome::Rebased(summary)) => {
                success_count += 1;
                spinner.finish_with_message(rebased_message(number, &target, &summary));
            }
            Ok(RebaseOutcome::Skipped(state)) => {
                skip_count += 1;
                spinner.finish_with_message(format!(
                    "{} PR #{} skipped (state: {})",
                    "⚠".yellow(),
                    number,
                    Output::status(&state.to_string())
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
            "Rebased {} pull request(s){}",
            success_count,
            if skip_count > 0 {
                format!(", {} skipped", skip_count)
            } else {
                String::new()
            }
        ));
    } else {
        Output::warning(&format!(
            "{} rebased, {} failed, {} skipped",
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

fn rebased_message(number: u64, target: &str, summary: &DriveSummary) -> String {
    let mut message = format!("{} PR #{} rebased onto {}", "✓".green(), number, target);
    if summary.resolution_passes > 0 {
        message.push_str(&format!(
            " ({} conflict stop(s) resolved",
            summary.resolution_passes
        ));
        if summary.skipped > 0 {
            message.push_str(&format!(", {} commit(s) dropped", summary.skipped));
        }
        message.push(')');
    }
    message
}

async fn rebase_one(
    client: &GitHubClient,
    tree: &WorkingTree,
    args: &RebaseArgs,
    target: &str,
    policy: &ResolutionPolicy,
    bot: &BotIdentity,
    number: u64,
) -> Result<RebaseOutcome> {
    let pr = client
        .get_pull_request(&args.owner, &args.repo, number)
        .await
        .with_context(|| format!("Failed to fetch PR #{}", number))?;

    if pr.state != PRState::Open {
        return Ok(RebaseOutcome::Skipped(pr.state));
    }

    Url::parse(&pr.head.clone_url).with_context(|| {
        format!(
            "PR #{} has an unusable head clone URL '{}'",
            number, pr.head.clone_url
        )
    })?;
    if let Some(updated_at) = pr.updated_at {
        debug!(number, %updated_at, head = %pr.head.ref_name, "rebasing PR");
    }

    git::restore_clean_state(tree)?;
    git::ensure_identity(tree, &bot.name, &bot.email)?;

    // Bring the target branch up to date with origin
    if git::branch_exists(tree, target) {
        git::checkout_branch(tree, target)?;
        git::pull_ff_only(tree, "origin", target)?;
    } else {
        git::fetch(tree, "origin", target)?;
        git::create_branch_from(tree, target, &format!("origin/{}", target))?;
    }

    // Materialize the PR branch from the contributor's fork
    let branch = format!("pr-{}-{}", number, pr.head.ref_name);
    git::ensure_remote(tree, "head", &pr.head.clone_url)?;
    if git::branch_exists(tree, &branch) {
        git::delete_branch(tree, &branch)?;
    }
    git::fetch(tree, "head", &format!("{}:{}", pr.head.ref_name, branch))?;
    git::checkout_branch(tree, &branch)?;

    let driver = Driver::new(tree, policy.clone());
    let summary = driver.run(&Operation::Rebase {
        target: target.to_string(),
    })?;

    // An aborted-and-restarted operation can leave HEAD detached
    git::ensure_on_branch(tree, &branch)?;

    push_updated_branch(tree, args, &branch, &pr)?;

    Ok(RebaseOutcome::Rebased(summary))
}

/// Push the rebased branch back to the fork, falling back to a plain force
/// push only when allowed and confirmed.
fn push_updated_branch(
    tree: &WorkingTree,
    args: &RebaseArgs,
    branch: &str,
    pr: &PullRequest,
) -> Result<()> {
    let refspec = format!("{}:{}", branch, pr.head.ref_name);

    match git::push_with_lease(tree, "head", &refspec) {
        Ok(()) => Ok(()),
        Err(e) if args.force => {
            warn!(error = %e, "lease-protected push rejected, falling back to --force");
            if !args.yes {
                let confirmed = dialoguer::Confirm::new()
                    .with_prompt(format!(
                        "Force push {} to {}'s fork, overwriting its history?",
                        branch, pr.head.owner
                    ))
                    .default(false)
                    .interact()?;
                if !confirmed {
                    bail!("Force push declined");
                }
            }
            git::force_push(tree, "head", &refspec)?;
            Ok(())
        }
        Err(e) => Err(e).context("Push rejected; re-run with --force to overwrite"),
    }
}
