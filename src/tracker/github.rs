//! GitHub pull request service implementation

use super::{IssueLinkMatcher, RetryPolicy, with_retry};
use crate::error::{Error, Result};
use crate::types::{CommitInfo, NewPullRequest, PrState, PullRequest};
use chrono::{DateTime, NaiveDate, Utc};
use octocrab::Octocrab;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::Write;
use tracing::{debug, info};

/// Items per page for list/search endpoints
const PER_PAGE: u32 = 100;

/// GitHub search never returns more than this many results
const SEARCH_RESULT_LIMIT: usize = 1000;

// REST response types. Only the fields we read are declared.

#[derive(Deserialize)]
struct SearchPage {
    total_count: usize,
    items: Vec<SearchItem>,
}

#[derive(Deserialize)]
struct SearchItem {
    number: u64,
}

#[derive(Deserialize)]
struct GhPull {
    number: u64,
    title: String,
    body: Option<String>,
    state: String,
    #[serde(default)]
    merged: Option<bool>,
    merged_at: Option<DateTime<Utc>>,
    html_url: String,
    base: GhRef,
    #[serde(default)]
    labels: Vec<GhLabel>,
}

#[derive(Deserialize)]
struct GhRef {
    #[serde(rename = "ref")]
    ref_field: String,
}

#[derive(Deserialize)]
struct GhLabel {
    name: String,
}

#[derive(Deserialize)]
struct GhCommit {
    sha: String,
    commit: GhCommitDetail,
}

#[derive(Deserialize)]
struct GhCommitDetail {
    message: String,
}

#[derive(Deserialize)]
struct RateLimit {
    resources: RateResources,
}

#[derive(Deserialize)]
struct RateResources {
    core: RateBucket,
}

#[derive(Deserialize)]
struct RateBucket {
    remaining: u32,
}

#[derive(Serialize)]
struct SearchParams<'a> {
    q: &'a str,
    per_page: u32,
    page: u32,
}

#[derive(Serialize)]
struct PageParams {
    per_page: u32,
    page: u32,
}

#[derive(Serialize)]
struct CreatePullPayload<'a> {
    title: &'a str,
    head: &'a str,
    base: &'a str,
    body: &'a str,
}

#[derive(Serialize)]
struct LabelsPayload<'a> {
    labels: &'a [String],
}

#[derive(Serialize)]
struct MilestonePayload {
    milestone: u64,
}

impl GhPull {
    fn into_pull_request(self, commits: Vec<CommitInfo>, links: &IssueLinkMatcher) -> PullRequest {
        let merged = self.merged.unwrap_or(false) || self.merged_at.is_some();
        let state = match self.state.as_str() {
            "open" => PrState::Open,
            _ if merged => PrState::Merged,
            _ => PrState::Closed,
        };
        let issues = links.extract(
            self.body
                .as_deref()
                .into_iter()
                .chain(commits.iter().map(|c| c.message.as_str())),
        );
        PullRequest {
            number: self.number,
            title: self.title,
            body: self.body,
            merged,
            state,
            base: self.base.ref_field,
            merged_at: self.merged_at,
            html_url: self.html_url,
            labels: self.labels.into_iter().map(|l| l.name).collect(),
            issues,
            commits,
        }
    }
}

/// Search options for [`GitHubService::search_numbers`]
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    /// Only PRs created after this date
    pub created_after: Option<NaiveDate>,
    /// Stop after this many hits per label
    pub max_results_per_label: Option<usize>,
}

/// GitHub service using octocrab
pub struct GitHubService {
    client: Octocrab,
    owner: String,
    repo: String,
    links: IssueLinkMatcher,
    search: SearchOptions,
    retry: RetryPolicy,
}

impl GitHubService {
    /// Create a new GitHub service.
    ///
    /// Without a token requests are anonymous (heavily rate limited).
    pub fn new(
        token: Option<&str>,
        owner: String,
        repo: String,
        host: Option<&str>,
        links: IssueLinkMatcher,
    ) -> Result<Self> {
        let base_uri = host.map(|h| format!("https://{h}/api/v3"));
        Self::with_base_uri(token, owner, repo, base_uri.as_deref(), links)
    }

    /// Create a service talking to an explicit API root
    pub fn with_base_uri(
        token: Option<&str>,
        owner: String,
        repo: String,
        base_uri: Option<&str>,
        links: IssueLinkMatcher,
    ) -> Result<Self> {
        let mut builder = Octocrab::builder();
        if let Some(token) = token {
            builder = builder.personal_token(token.to_string());
        }
        if let Some(uri) = base_uri {
            builder = builder
                .base_uri(uri)
                .map_err(|e| Error::GitHubApi(e.to_string()))?;
        }
        let client = builder
            .build()
            .map_err(|e| Error::GitHubApi(e.to_string()))?;

        Ok(Self {
            client,
            owner,
            repo,
            links,
            search: SearchOptions::default(),
            retry: RetryPolicy::default(),
        })
    }

    /// Set search restrictions
    #[must_use]
    pub fn with_search_options(mut self, search: SearchOptions) -> Self {
        self.search = search;
        self
    }

    /// Set the retry policy for read requests
    #[must_use]
    pub const fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn search_query(&self, branch: &str, label: Option<&str>) -> String {
        let mut q = format!("repo:{}/{} is:pr base:{branch}", self.owner, self.repo);
        if let Some(label) = label {
            let _ = write!(q, " label:\"{label}\"");
        }
        if let Some(date) = self.search.created_after {
            let _ = write!(q, " created:>{}", date.format("%Y-%m-%d"));
        }
        q
    }

    /// PR numbers matching the search for `branch` and an optional label
    pub async fn search_numbers(&self, branch: &str, label: Option<&str>) -> Result<Vec<u64>> {
        let q = self.search_query(branch, label);
        let limit = self
            .search
            .max_results_per_label
            .unwrap_or(SEARCH_RESULT_LIMIT)
            .min(SEARCH_RESULT_LIMIT);
        debug!(query = %q, limit, "searching PRs");

        let mut numbers = Vec::new();
        let mut page = 1;
        loop {
            let params = SearchParams {
                q: &q,
                per_page: PER_PAGE,
                page,
            };
            let result: SearchPage = with_retry(&self.retry, "search", || async {
                Ok(self.client.get("/search/issues", Some(&params)).await?)
            })
            .await?;

            let fetched = result.items.len();
            numbers.extend(result.items.into_iter().map(|i| i.number));
            debug!(page, fetched, total = result.total_count, "search page");

            if fetched == 0 || numbers.len() >= result.total_count || numbers.len() >= limit {
                break;
            }
            page += 1;
        }
        numbers.truncate(limit);
        Ok(numbers)
    }

    async fn get_pull(&self, number: u64) -> Result<GhPull> {
        let route = format!("/repos/{}/{}/pulls/{number}", self.owner, self.repo);
        with_retry(&self.retry, "get pull", || async {
            self.client
                .get::<GhPull, _, ()>(&route, None)
                .await
                .map_err(|e| match Error::from(e) {
                    Error::NotFound(_) => Error::NotFound(format!("PR #{number}")),
                    other => other,
                })
        })
        .await
    }

    async fn get_commits(&self, number: u64) -> Result<Vec<CommitInfo>> {
        let route = format!("/repos/{}/{}/pulls/{number}/commits", self.owner, self.repo);
        let mut commits = Vec::new();
        let mut page = 1;
        loop {
            let params = PageParams {
                per_page: PER_PAGE,
                page,
            };
            let batch: Vec<GhCommit> = with_retry(&self.retry, "list commits", || async {
                Ok(self.client.get(&route, Some(&params)).await?)
            })
            .await?;
            let fetched = batch.len();
            commits.extend(batch.into_iter().map(|c| CommitInfo {
                sha: c.sha,
                message: c.commit.message,
            }));
            if fetched < PER_PAGE as usize {
                break;
            }
            page += 1;
        }
        Ok(commits)
    }

    /// Fetch one PR including its commits and linked issues
    pub async fn pull_request(&self, number: u64) -> Result<PullRequest> {
        debug!(number, "fetching PR");
        let pull = self.get_pull(number).await?;
        let commits = self.get_commits(number).await?;
        let pr = pull.into_pull_request(commits, &self.links);
        debug!(number, state = %pr.state, commits = pr.commits.len(), "fetched PR");
        Ok(pr)
    }

    /// Search by each label (or once without labels) and fetch every hit
    pub async fn search_pull_requests(&self, branch: &str, labels: &[String]) -> Result<Vec<PullRequest>> {
        let mut numbers = BTreeSet::new();
        if labels.is_empty() {
            numbers.extend(self.search_numbers(branch, None).await?);
        } else {
            for label in labels {
                let found = self.search_numbers(branch, Some(label)).await?;
                info!(label = %label, count = found.len(), "found PRs for label");
                numbers.extend(found);
            }
        }

        let mut prs = Vec::with_capacity(numbers.len());
        for number in numbers {
            prs.push(self.pull_request(number).await?);
        }
        Ok(prs)
    }

    /// Open a PR, then add labels and milestone
    pub async fn create(&self, request: &NewPullRequest) -> Result<PullRequest> {
        debug!(head = %request.head, base = %request.base, "creating PR");
        let route = format!("/repos/{}/{}/pulls", self.owner, self.repo);
        let payload = CreatePullPayload {
            title: &request.title,
            head: &request.head,
            base: &request.base,
            body: &request.body,
        };

        let pull: GhPull = self
            .client
            .post(&route, Some(&payload))
            .await
            .map_err(|e| create_error(e, &request.head))?;
        let number = pull.number;

        if !request.labels.is_empty() {
            let route = format!("/repos/{}/{}/issues/{number}/labels", self.owner, self.repo);
            let _: serde_json::Value = self
                .client
                .post(&route, Some(&LabelsPayload { labels: &request.labels }))
                .await?;
            debug!(number, labels = ?request.labels, "labeled PR");
        }

        if let Some(milestone) = request.milestone {
            let route = format!("/repos/{}/{}/issues/{number}", self.owner, self.repo);
            let _: serde_json::Value = self
                .client
                .patch(&route, Some(&MilestonePayload { milestone }))
                .await?;
            debug!(number, milestone, "set milestone");
        }

        let mut pr = pull.into_pull_request(Vec::new(), &self.links);
        pr.labels.clone_from(&request.labels);
        debug!(number, "created PR");
        Ok(pr)
    }

    /// Remaining core API requests
    pub async fn rate_limit_remaining(&self) -> Result<u32> {
        let limit: RateLimit = self.client.get::<RateLimit, _, ()>("/rate_limit", None).await?;
        Ok(limit.resources.core.remaining)
    }
}

/// Map a PR creation failure, recognizing "already exists" validation errors
fn create_error(err: octocrab::Error, head: &str) -> Error {
    if let octocrab::Error::GitHub { source, .. } = &err
        && source.status_code.as_u16() == 422
        && format!("{source:?}").contains("already exists")
    {
        return Error::Conflict {
            head: head.to_string(),
        };
    }
    err.into()
}
