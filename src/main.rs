//! backport-pr CLI

mod cli;

use anstream::eprintln;
use backport_pr::backport::BackportChecks;
use backport_pr::error::Result;
use clap::{Parser, Subcommand};
use cli::style::Stylize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser)]
#[command(name = "backport-pr")]
#[command(about = "Find merged PRs that still need a backport and open backport PRs")]
#[command(version)]
struct Cli {
    /// Target release branch (default: current branch, minus any -backport-<n> suffix)
    #[arg(long, global = true)]
    branch: Option<String>,

    /// Comma-separated labels to search for (default: from config)
    #[arg(long, global = true, value_delimiter = ',')]
    label: Option<Vec<String>>,

    /// Directory holding cache files
    #[arg(long, global = true, env = "BACKPORT_PR_CACHE_DIR")]
    cache_dir: Option<PathBuf>,

    /// Config file
    #[arg(long, global = true, env = "BACKPORT_PR_CONFIG")]
    config: Option<PathBuf>,

    /// Log progress to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch PRs from GitHub and refresh the cache
    Search,

    /// Print cached PRs that still need a backport
    Crunch {
        /// Don't consult the issue tracker
        #[arg(long)]
        ignore_tracker: bool,

        /// Include PRs that are not merged
        #[arg(long)]
        ignore_not_merged: bool,

        /// Print a table with title, merge date and applied state
        #[arg(long)]
        long: bool,

        /// Only consider these PRs
        prs: Vec<u64>,
    },

    /// Cherry-pick PRs onto a backport branch
    Backport {
        /// Allow PRs that are not merged
        #[arg(long)]
        ignore_pr_not_merged: bool,

        /// Skip commits whose subject is already on the branch instead of failing
        #[arg(long)]
        ignore_commit_not_merged: bool,

        /// Keep PR commit order when git cannot order all commits
        #[arg(long)]
        ignore_order_commit_shas_non_equal: bool,

        /// PRs to backport, in order
        #[arg(required = true)]
        prs: Vec<u64>,
    },

    /// Backport PRs, push the branch and open the backport PR
    CreateBackportPr {
        /// Don't push the branch before opening the PR
        #[arg(long)]
        no_push: bool,

        /// Allow PRs that are not merged
        #[arg(long)]
        ignore_pr_not_merged: bool,

        /// Preview the PR and ask before pushing
        #[arg(long)]
        confirm: bool,

        /// Skip commits whose subject is already on the branch instead of failing
        #[arg(long)]
        ignore_commit_not_merged: bool,

        /// Keep PR commit order when git cannot order all commits
        #[arg(long)]
        ignore_order_commit_shas_non_equal: bool,

        /// Title of the backport PR
        title: String,

        /// PRs to backport, in order
        #[arg(required = true)]
        prs: Vec<u64>,
    },
}

fn init_tracing(verbose: bool) {
    let level = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .try_init()
        .ok();
}

async fn run(cli: Cli) -> Result<()> {
    let global = cli::GlobalOptions {
        branch: cli.branch,
        labels: cli.label,
        cache_dir: cli.cache_dir,
        config: cli.config,
    };

    match cli.command {
        Commands::Search => cli::run_search(&global).await,
        Commands::Crunch {
            ignore_tracker,
            ignore_not_merged,
            long,
            prs,
        } => {
            cli::run_crunch(
                &global,
                cli::CrunchOptions {
                    ignore_tracker,
                    ignore_not_merged,
                    long,
                },
                &prs,
            )
            .await
        }
        Commands::Backport {
            ignore_pr_not_merged,
            ignore_commit_not_merged,
            ignore_order_commit_shas_non_equal,
            prs,
        } => {
            let checks = BackportChecks {
                ignore_commit_applied: ignore_commit_not_merged,
                ignore_order_mismatch: ignore_order_commit_shas_non_equal,
            };
            cli::run_backport(&global, &prs, ignore_pr_not_merged, checks).await
        }
        Commands::CreateBackportPr {
            no_push,
            ignore_pr_not_merged,
            confirm,
            ignore_commit_not_merged,
            ignore_order_commit_shas_non_equal,
            title,
            prs,
        } => {
            cli::run_create_backport_pr(
                &global,
                &title,
                &prs,
                cli::CreatePrOptions {
                    push: !no_push,
                    ignore_pr_not_merged,
                    confirm,
                    checks: BackportChecks {
                        ignore_commit_applied: ignore_commit_not_merged,
                        ignore_order_mismatch: ignore_order_commit_shas_non_equal,
                    },
                },
            )
            .await
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {e}", "error:".error());
            ExitCode::from(e.exit_code())
        }
    }
}
