//! Backport execution - effectful operations
//!
//! Takes a `BackportPlan` and applies it through [`RepoOps`], then opens
//! the backport PR through the tracker.

use super::plan::{BackportPlan, build_pull_request};
use super::progress::ProgressCallback;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::repo::{CherryPickOutcome, CommitPresence, RepoOps, target_from_branch};
use crate::tracker::TrackerService;
use crate::types::PullRequest;
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Result of backporting one PR
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrBackportStatus {
    /// Commits were cherry-picked
    Success {
        /// Number of commits applied
        commits: usize,
        /// Commits left out because they were already on the branch
        skipped: Vec<String>,
    },
    /// Every commit was already on the branch
    AlreadyApplied,
    /// Cherry-pick stopped with conflicts
    CherryPickConflict {
        /// Conflicting paths
        files: Vec<String>,
    },
}

impl std::fmt::Display for PrBackportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success { commits, skipped } if skipped.is_empty() => {
                write!(f, "applied {commits} commit(s)")
            }
            Self::Success { commits, skipped } => write!(
                f,
                "applied {commits} commit(s), skipped {} already on the branch",
                skipped.join(", ")
            ),
            Self::AlreadyApplied => write!(f, "already applied"),
            Self::CherryPickConflict { files } if files.is_empty() => {
                write!(f, "cherry-pick stopped")
            }
            Self::CherryPickConflict { files } => {
                write!(f, "conflict in {}", files.join(", "))
            }
        }
    }
}

/// Outcome of [`backport`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackportReport {
    /// Backport branch the commits landed on
    pub branch: String,
    /// Whether the branch existed before this run
    pub reused_branch: bool,
    /// Per-PR results, in plan order, up to and including a conflict
    pub results: Vec<(u64, PrBackportStatus)>,
    /// PRs after a conflict that were not attempted
    pub untried: Vec<u64>,
}

impl BackportReport {
    /// PR whose cherry-pick conflicted, if any
    pub fn conflicted(&self) -> Option<u64> {
        self.results
            .iter()
            .find(|(_, status)| matches!(status, PrBackportStatus::CherryPickConflict { .. }))
            .map(|(number, _)| *number)
    }

    /// Whether every PR ended up on the branch
    pub fn is_complete(&self) -> bool {
        self.conflicted().is_none() && self.untried.is_empty()
    }
}

/// Look up `numbers` in the cache, fetching the ones it lacks from the tracker.
///
/// Order follows `numbers`.
pub async fn gather_prs(
    numbers: &[u64],
    cached: &[PullRequest],
    tracker: &dyn TrackerService,
) -> Result<Vec<PullRequest>> {
    let mut prs = Vec::with_capacity(numbers.len());
    for &number in numbers {
        if let Some(pr) = cached.iter().find(|pr| pr.number == number) {
            prs.push(pr.clone());
        } else {
            info!(number, "PR not in cache, fetching");
            prs.push(tracker.fetch_pull_request(number).await?);
        }
    }
    Ok(prs)
}

/// Check out the branch the backport lands on.
///
/// A checked out backport branch of the same target is kept, so a re-run
/// with the PRs left over after a conflict continues where it stopped.
/// Otherwise the planned branch is reused if it exists, or created from a
/// freshly pulled target branch. Returns the branch and whether it existed.
fn ensure_branch(plan: &BackportPlan, repo: &dyn RepoOps) -> Result<(String, bool)> {
    let current = repo.current_branch()?;
    if current != plan.target_branch && target_from_branch(&current) == plan.target_branch {
        if current != plan.branch_name {
            info!(branch = %current, planned = %plan.branch_name, "continuing on checked out backport branch");
        }
        return Ok((current, true));
    }

    if repo.branch_exists(&plan.branch_name)? {
        repo.checkout(&plan.branch_name, false)?;
        debug!(branch = %plan.branch_name, "reusing backport branch");
        return Ok((plan.branch_name.clone(), true));
    }

    repo.checkout(&plan.target_branch, false)?;
    repo.pull(&plan.upstream_remote, &plan.target_branch)?;
    repo.checkout(&plan.branch_name, true)?;
    debug!(branch = %plan.branch_name, "created backport branch");
    Ok((plan.branch_name.clone(), false))
}

/// Commits of one PR still to pick, and the ones already on the branch
struct PendingCommits {
    pending: Vec<String>,
    skipped: Vec<String>,
}

/// Sort every PR's commits into pending and skipped before anything is picked.
///
/// A commit only matched by subject fails the check unless told otherwise.
fn find_pending(plan: &BackportPlan, repo: &dyn RepoOps) -> Result<Vec<PendingCommits>> {
    let mut all = Vec::with_capacity(plan.prs.len());
    for pr in &plan.prs {
        let mut pending = Vec::new();
        let mut skipped = Vec::new();
        for commit in &pr.commits {
            match repo.commit_presence(commit)? {
                CommitPresence::Missing => pending.push(commit.sha.clone()),
                CommitPresence::Picked => skipped.push(commit.sha.clone()),
                CommitPresence::SameSubject if plan.checks.ignore_commit_applied => {
                    warn!(number = pr.number, sha = %commit.sha, "commit subject already on branch, skipping");
                    skipped.push(commit.sha.clone());
                }
                CommitPresence::SameSubject => {
                    return Err(Error::CommitAlreadyApplied {
                        number: pr.number,
                        sha: commit.sha.clone(),
                    });
                }
            }
        }
        all.push(PendingCommits {
            pending,
            skipped,
        });
    }
    Ok(all)
}

/// `shas` oldest first, as git orders them.
///
/// Fails if git returns a different set of commits, unless told otherwise.
fn order_commits(
    number: u64,
    shas: &[String],
    repo: &dyn RepoOps,
    ignore_mismatch: bool,
) -> Result<Vec<String>> {
    let ordered = repo.topo_order(shas)?;

    let asked: HashSet<&str> = shas.iter().map(String::as_str).collect();
    let got: HashSet<&str> = ordered.iter().map(String::as_str).collect();
    if asked == got && ordered.len() == asked.len() {
        return Ok(ordered);
    }

    let dropped: Vec<String> = shas
        .iter()
        .filter(|sha| !got.contains(sha.as_str()))
        .cloned()
        .collect();
    let added: Vec<String> = ordered
        .iter()
        .filter(|sha| !asked.contains(sha.as_str()))
        .cloned()
        .collect();
    if ignore_mismatch {
        warn!(number, ?dropped, ?added, "commit order mismatch, keeping PR order");
        return Ok(shas.to_vec());
    }
    Err(Error::CommitOrderMismatch {
        number,
        dropped,
        added,
    })
}

/// Execute the backport plan (EFFECTFUL)
///
/// Cherry-picks PRs in plan order and stops at the first conflict, leaving
/// the repository mid cherry-pick for manual resolution.
pub async fn backport(
    plan: &BackportPlan,
    repo: &dyn RepoOps,
    progress: &dyn ProgressCallback,
) -> Result<BackportReport> {
    let (branch, reused_branch) = ensure_branch(plan, repo)?;
    let message = if reused_branch {
        format!("Using existing branch {branch}")
    } else {
        format!("Created branch {branch}")
    };
    progress.on_message(&message).await;

    let commits = find_pending(plan, repo)?;

    let mut report = BackportReport {
        branch,
        reused_branch,
        results: Vec::with_capacity(plan.prs.len()),
        untried: Vec::new(),
    };

    for (index, (pr, found)) in plan.prs.iter().zip(commits).enumerate() {
        progress.on_pr_started(pr).await;

        let status = if found.pending.is_empty() {
            PrBackportStatus::AlreadyApplied
        } else {
            let ordered = order_commits(
                pr.number,
                &found.pending,
                repo,
                plan.checks.ignore_order_mismatch,
            )?;
            match repo.cherry_pick(&ordered)? {
                CherryPickOutcome::Applied => PrBackportStatus::Success {
                    commits: ordered.len(),
                    skipped: found.skipped,
                },
                CherryPickOutcome::Conflict { files } => {
                    PrBackportStatus::CherryPickConflict { files }
                }
            }
        };
        debug!(number = pr.number, %status, "backported PR");
        progress.on_pr_finished(pr.number, &status).await;

        let halted = matches!(status, PrBackportStatus::CherryPickConflict { .. });
        report.results.push((pr.number, status));
        if halted {
            report.untried = plan.prs[index + 1..].iter().map(|pr| pr.number).collect();
            break;
        }
    }

    Ok(report)
}

/// Backport, push and open the backport PR.
///
/// Nothing is pushed and no PR is opened unless every PR applied cleanly.
pub async fn create_backport_pr(
    plan: &BackportPlan,
    title: &str,
    push: bool,
    repo: &dyn RepoOps,
    tracker: &dyn TrackerService,
    config: &Config,
    progress: &dyn ProgressCallback,
) -> Result<PullRequest> {
    let report = backport(plan, repo, progress).await?;
    if let Some(conflicted) = report.conflicted() {
        return Err(Error::PartialBackport {
            conflicted,
            untried: report.untried,
        });
    }
    let request = build_pull_request(plan, &report.branch, title, config);

    if push {
        progress
            .on_message(&format!("Pushing {} to {}", report.branch, config.push_remote))
            .await;
        repo.push(&config.push_remote, &report.branch)?;
    }

    progress
        .on_message(&format!("Opening PR {} -> {}", request.head, request.base))
        .await;
    let pr = tracker.create_pull_request(&request).await?;
    info!(number = pr.number, url = %pr.html_url, "opened backport PR");
    Ok(pr)
}
