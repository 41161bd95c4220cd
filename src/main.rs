//! shepr CLI entry point

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};

use shepr::cli::commands::{backport, rebase};

#[derive(Parser)]
#[command(name = "shepr")]
#[command(author, version, about = "Shepherds stalled and backport pull requests", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Rebase stalled PRs onto their target branch
    Rebase(rebase::RebaseArgs),
    /// Cherry-pick merged PRs onto a release branch
    Backport(backport::BackportArgs),
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    match cli.command {
        Some(Commands::Rebase(args)) => {
            rebase::run(args).await?;
        }
        Some(Commands::Backport(args)) => {
            backport::run(args).await?;
        }
        Some(Commands::Completions { shell }) => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "shepr", &mut std::io::stdout());
        }
        None => {
            println!("shepr - keeps stalled and backport pull requests moving");
            println!("Run 'shepr --help' for usage");
        }
    }

    Ok(())
}

fn init_tracing(verbosity: u8) {
    let default_filter = match verbosity {
        0 => "shepr=info",
        1 => "shepr=debug",
        _ => "shepr=trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
