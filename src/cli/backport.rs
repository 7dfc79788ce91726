//! Backport command - cherry-pick PRs onto a backport branch

use crate::cli::CliProgress;
use crate::cli::context::{CommandContext, GlobalOptions};
use crate::cli::style::{CHECK, Stylize};
use anstream::eprintln;
use backport_pr::backport::{
    BackportChecks, BackportPlan, backport, backport_branch_numbers, check_merged,
    create_backport_plan, gather_prs,
};
use backport_pr::error::{Error, Result};
use backport_pr::repo::{RepoOps, target_from_branch};
use backport_pr::tracker::TrackerService;
use backport_pr::types::PullRequest;
use tracing::info;

/// Resolve `numbers` and build the plan shared by `backport` and `create-backport-pr`.
///
/// On a checked out backport branch of the target, the PRs named by the
/// branch come first, so the plan covers everything that lands on it.
pub async fn prepare_plan(
    ctx: &CommandContext,
    numbers: &[u64],
    tracker: &dyn TrackerService,
    ignore_pr_not_merged: bool,
    checks: BackportChecks,
) -> Result<BackportPlan> {
    let current = ctx.repo()?.current_branch()?;
    let on_backport_branch =
        current != ctx.target_branch && target_from_branch(&current) == ctx.target_branch;

    let mut all = Vec::with_capacity(numbers.len());
    if on_backport_branch {
        let earlier = backport_branch_numbers(&current, &ctx.target_branch).unwrap_or_default();
        info!(branch = %current, earlier = ?earlier, "continuing on backport branch");
        all.extend(earlier);
    }
    for &number in numbers {
        if !all.contains(&number) {
            all.push(number);
        }
    }

    let cached: Vec<PullRequest> = ctx.load_cache()?.map(|c| c.prs).unwrap_or_default();
    let prs = gather_prs(&all, &cached, tracker).await?;
    check_merged(&prs, ignore_pr_not_merged)?;
    let mut plan = create_backport_plan(prs, &ctx.target_branch)?
        .with_upstream_remote(ctx.config.upstream_remote.clone())
        .with_checks(checks);
    if on_backport_branch {
        plan.branch_name = current;
    }
    Ok(plan)
}

/// Run the backport command
pub async fn run_backport(
    options: &GlobalOptions,
    prs: &[u64],
    ignore_pr_not_merged: bool,
    checks: BackportChecks,
) -> Result<()> {
    let ctx = CommandContext::new(options)?;
    let repo = ctx.repo()?;
    let tracker = ctx.tracker()?;
    let plan = prepare_plan(&ctx, prs, &tracker, ignore_pr_not_merged, checks).await?;

    eprintln!(
        "Backporting {} PR(s) to {} on {}",
        plan.prs.len().accent(),
        plan.target_branch.emphasis(),
        plan.branch_name.emphasis()
    );

    let report = backport(&plan, repo, &CliProgress).await?;
    let numbers: Vec<String> = plan.numbers().iter().map(u64::to_string).collect();

    if let Some(conflicted) = report.conflicted() {
        eprintln!();
        eprintln!(
            "{}",
            "Resolve the conflicts and run 'git cherry-pick --continue', then re-run:".warn()
        );
        eprintln!("  backport-pr backport {}", numbers.join(" "));
        return Err(Error::PartialBackport {
            conflicted,
            untried: report.untried,
        });
    }

    eprintln!();
    eprintln!("{}", format!("{CHECK} Backport branch {} is ready", report.branch).success());
    eprintln!(
        "{}",
        format!(
            "  Next: backport-pr create-backport-pr \"<title>\" {}",
            numbers.join(" ")
        )
        .muted()
    );
    Ok(())
}
