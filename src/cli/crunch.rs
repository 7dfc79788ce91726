//! Crunch command - list cached PRs that still need a backport

use crate::cli::context::{CommandContext, GlobalOptions};
use crate::cli::style::Stylize;
use anstream::{eprintln, println};
use backport_pr::error::Result;
use backport_pr::repo::{CommitPresence, RepoOps};
use backport_pr::select::{
    SelectOptions, classify, gather_tracker_issues, select_candidates, tracker_scope,
};
use backport_pr::types::{PullRequest, TrackerIssue};
use std::collections::HashMap;
use tracing::info;

/// Widest title shown by `--long`
const TITLE_WIDTH: usize = 60;

/// Options for the crunch command
#[derive(Debug, Clone, Copy, Default)]
pub struct CrunchOptions {
    /// Skip tracker lookups
    pub ignore_tracker: bool,
    /// Keep unmerged PRs
    pub ignore_not_merged: bool,
    /// Print a table instead of bare numbers
    pub long: bool,
}

/// Run the crunch command
pub async fn run_crunch(options: &GlobalOptions, crunch: CrunchOptions, prs: &[u64]) -> Result<()> {
    let ctx = CommandContext::new(options)?;
    let cache = ctx.require_cache()?;

    let select = SelectOptions {
        ignore_tracker: crunch.ignore_tracker,
        ignore_not_merged: crunch.ignore_not_merged,
    };

    let requested = (!prs.is_empty()).then_some(prs);
    let scope = tracker_scope(&cache.prs, select, requested)?;
    let issues: HashMap<String, TrackerIssue> = if scope.is_empty() {
        HashMap::new()
    } else {
        let tracker = ctx.issue_tracker()?;
        gather_tracker_issues(scope, &tracker).await?
    };

    for pr in &cache.prs {
        if requested.is_some_and(|r| !r.contains(&pr.number)) {
            continue;
        }
        if let Some(reason) = classify(pr, &issues, &ctx.target_branch, select) {
            info!(number = pr.number, %reason, "not a candidate");
        }
    }

    let candidates = select_candidates(&cache.prs, &issues, &ctx.target_branch, select, requested)?;

    if crunch.long {
        print_table(&ctx, &cache.prs, &candidates);
    } else {
        for number in &candidates {
            println!("{number}");
        }
    }

    if candidates.is_empty() {
        eprintln!(
            "{}",
            format!("Nothing left to backport to {}.", ctx.target_branch).muted()
        );
    }
    Ok(())
}

fn print_table(ctx: &CommandContext, entries: &[PullRequest], candidates: &[u64]) {
    println!("{:<7} {:<TITLE_WIDTH$} {:<10} APPLIED", "NUM", "TITLE", "MERGED AT");
    for number in candidates {
        let Some(pr) = entries.iter().find(|pr| pr.number == *number) else {
            continue;
        };
        let merged_at = pr
            .merged_at
            .map_or_else(|| "-".to_string(), |t| t.format("%Y-%m-%d").to_string());
        println!(
            "{:<7} {:<TITLE_WIDTH$} {:<10} {}",
            pr.number,
            truncate(&pr.title, TITLE_WIDTH),
            merged_at,
            applied_state(ctx, pr)
        );
    }
}

/// Whether the PR's commits are already on the current branch
fn applied_state(ctx: &CommandContext, pr: &PullRequest) -> String {
    let Ok(repo) = ctx.repo() else {
        return "?".to_string();
    };
    let mut applied = 0;
    let mut guessed = 0;
    for commit in &pr.commits {
        match repo.commit_presence(commit) {
            Ok(CommitPresence::Picked) => applied += 1,
            Ok(CommitPresence::SameSubject) => guessed += 1,
            Ok(CommitPresence::Missing) => {}
            Err(e) => {
                info!(sha = %commit.sha, error = %e, "could not check commit");
                return "?".to_string();
            }
        }
    }
    if guessed > 0 && applied + guessed == pr.commits.len() {
        return "maybe".warn();
    }
    match applied {
        0 => "no".to_string(),
        n if n == pr.commits.len() => "yes".success(),
        n => format!("{n}/{}", pr.commits.len()).warn(),
    }
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut out: String = text.chars().take(width.saturating_sub(1)).collect();
    out.push('…');
    out
}
