//! Create-backport-pr command - backport, push and open the PR

use crate::cli::CliProgress;
use crate::cli::backport::prepare_plan;
use crate::cli::context::{CommandContext, GlobalOptions};
use crate::cli::style::{Stylize, check, hyperlink};
use anstream::{eprintln, println};
use backport_pr::backport::{BackportChecks, build_pull_request, create_backport_pr};
use backport_pr::error::{Error, Result};
use backport_pr::types::NewPullRequest;
use dialoguer::Confirm;

/// Options for the create-backport-pr command
#[derive(Debug, Clone, Copy)]
pub struct CreatePrOptions {
    /// Push the branch before opening the PR
    pub push: bool,
    /// Allow unmerged PRs
    pub ignore_pr_not_merged: bool,
    /// Preview and prompt before doing anything
    pub confirm: bool,
    /// Pre-flight checks to skip
    pub checks: BackportChecks,
}

/// Run the create-backport-pr command
pub async fn run_create_backport_pr(
    options: &GlobalOptions,
    title: &str,
    prs: &[u64],
    create: CreatePrOptions,
) -> Result<()> {
    let ctx = CommandContext::new(options)?;
    let repo = ctx.repo()?;
    let tracker = ctx.authenticated_tracker()?;
    let plan = prepare_plan(
        &ctx,
        prs,
        &tracker,
        create.ignore_pr_not_merged,
        create.checks,
    )
    .await?;

    if create.confirm {
        let request = build_pull_request(&plan, &plan.branch_name, title, &ctx.config);
        print_preview(&request, &plan.branch_name, create.push.then_some(ctx.config.push_remote.as_str()));
        if !Confirm::new()
            .with_prompt("Proceed?")
            .default(true)
            .interact()
            .map_err(|e| Error::Internal(format!("Failed to read confirmation: {e}")))?
        {
            eprintln!("{}", "Aborted".muted());
            return Ok(());
        }
        eprintln!();
    }

    let pr = create_backport_pr(
        &plan,
        title,
        create.push,
        repo,
        &tracker,
        &ctx.config,
        &CliProgress,
    )
    .await?;

    eprintln!(
        "{} Opened {}",
        check(),
        hyperlink(&format!("#{}", pr.number), &pr.html_url).accent()
    );
    println!("{}", pr.html_url);
    Ok(())
}

fn print_preview(request: &NewPullRequest, branch: &str, push_remote: Option<&str>) {
    eprintln!("{}", "Backport PR preview".emphasis());
    eprintln!("  {} {}", "title:".muted(), request.title);
    eprintln!("  {} {} -> {}", "branch:".muted(), request.head, request.base);
    eprintln!("  {} {}", "body:".muted(), request.body);
    if !request.labels.is_empty() {
        eprintln!("  {} {}", "labels:".muted(), request.labels.join(", "));
    }
    if let Some(milestone) = request.milestone {
        eprintln!("  {} {milestone}", "milestone:".muted());
    }
    match push_remote {
        Some(remote) => eprintln!("  {} {branch} to {remote}", "push:".muted()),
        None => eprintln!("  {} {}", "push:".muted(), "skipped (--no-push)".warn()),
    }
    eprintln!();
}
