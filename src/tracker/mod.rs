//! Tracker services: GitHub for pull requests, Redmine for tracker issues
//!
//! Both sit behind [`TrackerService`] so the selector and the backport
//! driver can be tested against a mock.

mod factory;
mod github;
mod links;
mod redmine;

pub use factory::{Tracker, create_tracker};
pub use github::{GitHubService, SearchOptions};
pub use links::IssueLinkMatcher;
pub use redmine::RedmineService;

use crate::error::Result;
use crate::types::{NewPullRequest, PullRequest, TrackerIssue};
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Tracker service trait for PR and issue operations
#[async_trait]
pub trait TrackerService: Send + Sync {
    /// Fetch every PR targeting `branch` that carries one of `labels`
    /// (or any PR if `labels` is empty), merged or not.
    async fn fetch_merged_prs(&self, branch: &str, labels: &[String]) -> Result<Vec<PullRequest>>;

    /// Fetch a single PR with its commits
    async fn fetch_pull_request(&self, number: u64) -> Result<PullRequest>;

    /// Fetch a tracker issue and the state of its backports
    async fn fetch_issue(&self, id: &str) -> Result<TrackerIssue>;

    /// Open a pull request, then apply its labels and milestone
    async fn create_pull_request(&self, request: &NewPullRequest) -> Result<PullRequest>;

    /// Remaining API request budget, if the service reports one
    async fn remaining_requests(&self) -> Result<Option<u32>> {
        Ok(None)
    }
}

/// Bounded retry for transient network failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub attempts: u32,
    /// Delay before the second attempt; grows linearly afterwards
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries
    pub const fn none() -> Self {
        Self {
            attempts: 1,
            delay: Duration::ZERO,
        }
    }
}

/// Run `op`, retrying while it fails with a transient error.
///
/// Non-transient errors are returned immediately.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, what: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;
    loop {
        match op().await {
            Err(e) if e.is_transient() && attempt < attempts => {
                warn!(what, attempt, error = %e, "transient failure, retrying");
                tokio::time::sleep(policy.delay * attempt).await;
                attempt += 1;
            }
            result => return result,
        }
    }
}
