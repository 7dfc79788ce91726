//! Mock tracker service for testing

#![allow(dead_code)]

use async_trait::async_trait;
use backport_pr::error::{Error, Result};
use backport_pr::tracker::TrackerService;
use backport_pr::types::{NewPullRequest, PrState, PullRequest, TrackerIssue};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// Simple mock tracker service
///
/// Features:
/// - Canned PRs and tracker issues
/// - Auto-incrementing numbers for created PRs
/// - Call tracking for verification
/// - Error injection for failure path testing
pub struct MockTrackerService {
    next_pr_number: AtomicU64,
    search_results: Mutex<Vec<PullRequest>>,
    pull_requests: Mutex<HashMap<u64, PullRequest>>,
    issues: Mutex<HashMap<String, TrackerIssue>>,
    // Call tracking
    search_calls: Mutex<Vec<(String, Vec<String>)>>,
    fetch_pr_calls: Mutex<Vec<u64>>,
    fetch_issue_calls: Mutex<Vec<String>>,
    create_pr_calls: Mutex<Vec<NewPullRequest>>,
    // Error injection
    error_on_search: Mutex<Option<Error>>,
    error_on_fetch_issue: Mutex<Option<Error>>,
    error_on_create_pr: Mutex<Option<Error>>,
}

impl Default for MockTrackerService {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTrackerService {
    /// Create an empty mock
    pub fn new() -> Self {
        Self {
            next_pr_number: AtomicU64::new(1000),
            search_results: Mutex::new(Vec::new()),
            pull_requests: Mutex::new(HashMap::new()),
            issues: Mutex::new(HashMap::new()),
            search_calls: Mutex::new(Vec::new()),
            fetch_pr_calls: Mutex::new(Vec::new()),
            fetch_issue_calls: Mutex::new(Vec::new()),
            create_pr_calls: Mutex::new(Vec::new()),
            error_on_search: Mutex::new(None),
            error_on_fetch_issue: Mutex::new(None),
            error_on_create_pr: Mutex::new(None),
        }
    }

    // === Canned responses ===

    /// PRs returned by `fetch_merged_prs`
    pub fn set_search_results(&self, prs: Vec<PullRequest>) {
        *self.search_results.lock().unwrap() = prs;
    }

    /// PR returned by `fetch_pull_request`
    pub fn add_pull_request(&self, pr: PullRequest) {
        self.pull_requests.lock().unwrap().insert(pr.number, pr);
    }

    /// Issue returned by `fetch_issue`
    pub fn add_issue(&self, issue: TrackerIssue) {
        self.issues.lock().unwrap().insert(issue.id.clone(), issue);
    }

    // === Error injection methods ===

    /// Make `fetch_merged_prs` fail
    pub fn fail_search(&self, err: Error) {
        *self.error_on_search.lock().unwrap() = Some(err);
    }

    /// Make `fetch_issue` fail
    pub fn fail_fetch_issue(&self, err: Error) {
        *self.error_on_fetch_issue.lock().unwrap() = Some(err);
    }

    /// Make `create_pull_request` fail
    pub fn fail_create_pr(&self, err: Error) {
        *self.error_on_create_pr.lock().unwrap() = Some(err);
    }

    // === Call verification methods ===

    /// All `fetch_merged_prs` calls as (branch, labels)
    pub fn get_search_calls(&self) -> Vec<(String, Vec<String>)> {
        self.search_calls.lock().unwrap().clone()
    }

    /// All PR numbers passed to `fetch_pull_request`
    pub fn get_fetch_pr_calls(&self) -> Vec<u64> {
        self.fetch_pr_calls.lock().unwrap().clone()
    }

    /// All IDs passed to `fetch_issue`
    pub fn get_fetch_issue_calls(&self) -> Vec<String> {
        self.fetch_issue_calls.lock().unwrap().clone()
    }

    /// All `create_pull_request` requests
    pub fn get_create_pr_calls(&self) -> Vec<NewPullRequest> {
        self.create_pr_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl TrackerService for MockTrackerService {
    async fn fetch_merged_prs(&self, branch: &str, labels: &[String]) -> Result<Vec<PullRequest>> {
        self.search_calls
            .lock()
            .unwrap()
            .push((branch.to_string(), labels.to_vec()));
        if let Some(err) = self.error_on_search.lock().unwrap().take() {
            return Err(err);
        }
        Ok(self.search_results.lock().unwrap().clone())
    }

    async fn fetch_pull_request(&self, number: u64) -> Result<PullRequest> {
        self.fetch_pr_calls.lock().unwrap().push(number);
        self.pull_requests
            .lock()
            .unwrap()
            .get(&number)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("PR #{number}")))
    }

    async fn fetch_issue(&self, id: &str) -> Result<TrackerIssue> {
        self.fetch_issue_calls.lock().unwrap().push(id.to_string());
        if let Some(err) = self.error_on_fetch_issue.lock().unwrap().take() {
            return Err(err);
        }
        self.issues
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("tracker issue {id}")))
    }

    async fn create_pull_request(&self, request: &NewPullRequest) -> Result<PullRequest> {
        self.create_pr_calls.lock().unwrap().push(request.clone());
        if let Some(err) = self.error_on_create_pr.lock().unwrap().take() {
            return Err(err);
        }
        let number = self.next_pr_number.fetch_add(1, Ordering::SeqCst);
        Ok(PullRequest {
            number,
            title: request.title.clone(),
            body: Some(request.body.clone()),
            merged: false,
            state: PrState::Open,
            base: request.base.clone(),
            merged_at: None,
            html_url: format!("https://github.com/ceph/ceph/pull/{number}"),
            labels: request.labels.clone(),
            issues: vec![],
            commits: vec![],
        })
    }
}
