//! Tracker construction from config

use super::{GitHubService, IssueLinkMatcher, RedmineService, SearchOptions, TrackerService};
use crate::auth::GitHubAuthConfig;
use crate::config::Config;
use crate::error::Result;
use crate::types::{NewPullRequest, PullRequest, TrackerIssue};
use async_trait::async_trait;
use tracing::debug;

/// GitHub for pull requests plus Redmine for issues
pub struct Tracker {
    github: GitHubService,
    issues: RedmineService,
}

impl Tracker {
    /// Combine the two services
    pub const fn new(github: GitHubService, issues: RedmineService) -> Self {
        Self { github, issues }
    }
}

#[async_trait]
impl TrackerService for Tracker {
    async fn fetch_merged_prs(&self, branch: &str, labels: &[String]) -> Result<Vec<PullRequest>> {
        self.github.search_pull_requests(branch, labels).await
    }

    async fn fetch_pull_request(&self, number: u64) -> Result<PullRequest> {
        self.github.pull_request(number).await
    }

    async fn fetch_issue(&self, id: &str) -> Result<TrackerIssue> {
        self.issues.issue(id).await
    }

    async fn create_pull_request(&self, request: &NewPullRequest) -> Result<PullRequest> {
        self.github.create(request).await
    }

    async fn remaining_requests(&self) -> Result<Option<u32>> {
        self.github.rate_limit_remaining().await.map(Some)
    }
}

/// Create the tracker for `config`.
///
/// Without `auth` GitHub requests go out anonymously.
pub fn create_tracker(config: &Config, auth: Option<&GitHubAuthConfig>) -> Result<Tracker> {
    let links = IssueLinkMatcher::new(&config.tracker_url)?;
    let github = GitHubService::new(
        auth.map(|a| a.token.as_str()),
        config.owner.clone(),
        config.repo.clone(),
        config.github_host.as_deref(),
        links,
    )?
    .with_search_options(SearchOptions {
        created_after: config.created_after,
        max_results_per_label: config.max_results_per_label,
    });
    let issues = RedmineService::new(&config.tracker_url)?;

    debug!(
        repo = %format!("{}/{}", config.owner, config.repo),
        tracker = %config.tracker_url,
        authenticated = auth.is_some(),
        "created tracker"
    );
    Ok(Tracker::new(github, issues))
}
