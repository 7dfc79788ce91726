//! Core types for backport-pr

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// PR state (open, closed, merged)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrState {
    /// PR is still open
    Open,
    /// PR was closed without merging
    Closed,
    /// PR was merged
    Merged,
}

impl std::fmt::Display for PrState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Closed => write!(f, "closed"),
            Self::Merged => write!(f, "merged"),
        }
    }
}

/// A commit belonging to a pull request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitInfo {
    /// Full commit SHA
    pub sha: String,
    /// Full commit message
    pub message: String,
}

impl CommitInfo {
    /// First line of the commit message
    pub fn subject(&self) -> &str {
        self.message.lines().next().unwrap_or_default()
    }
}

/// A pull request as fetched from GitHub and stored in the cache.
///
/// The serialized field `number` is read by external tooling
/// (`jq '.prs[].number'`), so its name must not change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    /// PR number
    pub number: u64,
    /// PR title
    pub title: String,
    /// PR body/description
    #[serde(default)]
    pub body: Option<String>,
    /// Whether the PR was merged
    pub merged: bool,
    /// Current state of the PR
    pub state: PrState,
    /// Branch the PR targets
    pub base: String,
    /// When the PR was merged
    #[serde(default)]
    pub merged_at: Option<DateTime<Utc>>,
    /// Web URL for the PR
    #[serde(default)]
    pub html_url: String,
    /// Label names
    #[serde(default)]
    pub labels: Vec<String>,
    /// Linked tracker issue IDs (sorted, unique)
    #[serde(default)]
    pub issues: Vec<String>,
    /// Commits in PR order
    #[serde(default)]
    pub commits: Vec<CommitInfo>,
}

impl PullRequest {
    /// Whether this PR counts as merged for backport purposes
    pub const fn is_merged(&self) -> bool {
        self.merged || matches!(self.state, PrState::Merged)
    }
}

/// A backport issue hanging off a tracker issue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueBackport {
    /// Tracker ID of the backport issue
    pub id: String,
    /// Release branch the backport targets
    pub branch: String,
    /// Status name as reported by the tracker
    pub status: String,
    /// Whether the backport is done
    pub resolved: bool,
}

/// An issue on the tracker, possibly referenced from PRs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerIssue {
    /// Tracker issue ID
    pub id: String,
    /// Issue subject line
    pub subject: String,
    /// Status name as reported by the tracker
    pub status: String,
    /// PR the tracker says fixes this issue (back-reference only)
    pub linked_pr: Option<u64>,
    /// Backports of this issue to release branches
    pub backports: Vec<IssueBackport>,
}

impl TrackerIssue {
    /// Whether a completed backport to `branch` is recorded on the tracker
    pub fn is_backported_to(&self, branch: &str) -> bool {
        self.backports
            .iter()
            .any(|b| b.resolved && b.branch == branch)
    }
}

/// Request to open a new pull request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPullRequest {
    /// PR title
    pub title: String,
    /// Head reference (`branch` or `owner:branch`)
    pub head: String,
    /// Base branch
    pub base: String,
    /// PR body
    pub body: String,
    /// Labels to apply after creation
    pub labels: Vec<String>,
    /// Milestone number to assign after creation
    pub milestone: Option<u64>,
}
