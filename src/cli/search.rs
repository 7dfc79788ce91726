//! Search command - refresh the PR cache from GitHub

use crate::cli::context::{CommandContext, GlobalOptions};
use crate::cli::style::{Stylize, check, spinner_style};
use anstream::eprintln;
use backport_pr::cache::Cache;
use backport_pr::error::Result;
use backport_pr::tracker::TrackerService;
use indicatif::ProgressBar;
use std::time::Duration;
use tracing::{debug, info};

/// Run the search command
pub async fn run_search(options: &GlobalOptions) -> Result<()> {
    let ctx = CommandContext::new(options)?;
    let tracker = ctx.authenticated_tracker()?;
    let source = &ctx.config.source_branch;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(spinner_style());
    spinner.set_message(format!(
        "Searching PRs merged into {} labeled {}...",
        source.emphasis(),
        ctx.labels.join(", ").accent()
    ));
    spinner.enable_steady_tick(Duration::from_millis(80));

    let prs = match tracker.fetch_merged_prs(source, &ctx.labels).await {
        Ok(prs) => prs,
        Err(e) => {
            spinner.finish_and_clear();
            return Err(e);
        }
    };

    let cache = Cache::new(source.clone(), ctx.target_branch.clone(), ctx.labels.clone(), prs);
    let path = ctx.store.save(&cache)?;

    spinner.finish_with_message(format!(
        "{} Cached {} PR(s) for {} in {}",
        check(),
        cache.prs.len().accent(),
        ctx.target_branch.emphasis(),
        path.display().muted()
    ));
    info!(count = cache.prs.len(), path = %path.display(), "saved cache");

    match tracker.remaining_requests().await {
        Ok(Some(remaining)) => info!(remaining, "GitHub API requests left"),
        Ok(None) => {}
        Err(e) => debug!(error = %e, "could not read rate limit"),
    }

    if cache.prs.is_empty() {
        eprintln!("{}", "No PRs matched the search.".warn());
    }
    Ok(())
}
