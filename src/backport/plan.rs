//! Backport planning - pure functions for creating backport plans
//!
//! No I/O happens here. PRs are resolved beforehand by the caller.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::types::{NewPullRequest, PullRequest};

/// Longest number list kept in a backport branch name
pub const MAX_BRANCH_NUMBERS_LEN: usize = 60;

/// Default remote the target branch is pulled from
const DEFAULT_UPSTREAM: &str = "upstream";

/// Pre-flight checks the driver may be told to skip
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackportChecks {
    /// Skip commits whose subject is already on the branch instead of failing
    pub ignore_commit_applied: bool,
    /// Cherry-pick in API order when topological ordering loses commits
    pub ignore_order_mismatch: bool,
}

/// What a backport will do
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackportPlan {
    /// Release branch being backported to
    pub target_branch: String,
    /// Local branch the commits land on
    pub branch_name: String,
    /// Remote the target branch is refreshed from before branching
    pub upstream_remote: String,
    /// PRs in the order they are applied
    pub prs: Vec<PullRequest>,
    /// Checks the driver skips
    pub checks: BackportChecks,
}

impl BackportPlan {
    /// PR numbers in plan order
    pub fn numbers(&self) -> Vec<u64> {
        self.prs.iter().map(|pr| pr.number).collect()
    }

    /// Total commits across all PRs
    pub fn commit_count(&self) -> usize {
        self.prs.iter().map(|pr| pr.commits.len()).sum()
    }

    /// Pull the target branch from `remote` instead of `upstream`
    #[must_use]
    pub fn with_upstream_remote(mut self, remote: impl Into<String>) -> Self {
        self.upstream_remote = remote.into();
        self
    }

    /// Skip the given pre-flight checks
    #[must_use]
    pub const fn with_checks(mut self, checks: BackportChecks) -> Self {
        self.checks = checks;
        self
    }
}

/// `<target>-backport-<n1>-<n2>...`, with the number part capped at
/// [`MAX_BRANCH_NUMBERS_LEN`] characters.
pub fn backport_branch_name(target_branch: &str, numbers: &[u64]) -> String {
    let joined = numbers
        .iter()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join("-");
    let cut = joined.len().min(MAX_BRANCH_NUMBERS_LEN);
    let numbers = joined[..cut].trim_end_matches('-');
    format!("{target_branch}-backport-{numbers}")
}

/// PR numbers encoded in a backport branch for `target_branch`.
///
/// `None` for other branches and for names whose number part may have been
/// cut at [`MAX_BRANCH_NUMBERS_LEN`].
pub fn backport_branch_numbers(branch: &str, target_branch: &str) -> Option<Vec<u64>> {
    let numbers = branch
        .strip_prefix(target_branch)?
        .strip_prefix("-backport-")?;
    if numbers.len() + 1 >= MAX_BRANCH_NUMBERS_LEN {
        return None;
    }
    numbers.split('-').map(|n| n.parse().ok()).collect()
}

/// Create a backport plan (PURE - no I/O)
///
/// PRs are applied in the order given. Every PR must carry its commits.
pub fn create_backport_plan(prs: Vec<PullRequest>, target_branch: &str) -> Result<BackportPlan> {
    if prs.is_empty() {
        return Err(Error::InvalidInput("no PRs to backport".to_string()));
    }
    if let Some(pr) = prs.iter().find(|pr| pr.commits.is_empty()) {
        return Err(Error::InvalidInput(format!(
            "PR #{} has no commits recorded. Run 'backport-pr search' to refresh it",
            pr.number
        )));
    }

    let numbers: Vec<u64> = prs.iter().map(|pr| pr.number).collect();
    Ok(BackportPlan {
        target_branch: target_branch.to_string(),
        branch_name: backport_branch_name(target_branch, &numbers),
        upstream_remote: DEFAULT_UPSTREAM.to_string(),
        prs,
        checks: BackportChecks::default(),
    })
}

/// Reject PRs that aren't merged, unless told to ignore that
pub fn check_merged(prs: &[PullRequest], ignore_not_merged: bool) -> Result<()> {
    if ignore_not_merged {
        return Ok(());
    }
    match prs.iter().find(|pr| !pr.is_merged()) {
        Some(pr) => Err(Error::NotMerged(pr.number)),
        None => Ok(()),
    }
}

/// Backport PR title, prefixed with the target branch once
pub fn compose_title(target_branch: &str, title: &str) -> String {
    let title = title.trim();
    let prefix = format!("{target_branch}: ");
    if title.starts_with(&prefix) {
        title.to_string()
    } else {
        format!("{prefix}{title}")
    }
}

/// `Backport of #a, #b`
pub fn compose_body(numbers: &[u64]) -> String {
    let refs: Vec<String> = numbers.iter().map(|n| format!("#{n}")).collect();
    format!("Backport of {}", refs.join(", "))
}

/// Labels of the source PRs that are in `copy_labels`, in `copy_labels` order
pub fn backport_labels(prs: &[PullRequest], copy_labels: &[String]) -> Vec<String> {
    copy_labels
        .iter()
        .filter(|label| prs.iter().any(|pr| pr.labels.contains(label)))
        .cloned()
        .collect()
}

/// The pull request that `create_backport_pr` opens for `plan` from `branch`
pub fn build_pull_request(
    plan: &BackportPlan,
    branch: &str,
    title: &str,
    config: &Config,
) -> NewPullRequest {
    NewPullRequest {
        title: compose_title(&plan.target_branch, title),
        head: config.head_ref(branch),
        base: plan.target_branch.clone(),
        body: compose_body(&plan.numbers()),
        labels: backport_labels(&plan.prs, &config.copy_labels),
        milestone: config.milestone,
    }
}
