//! Shared test utilities

#![allow(dead_code)]

pub mod fake_repo;
pub mod mock_tracker;

pub use fake_repo::FakeRepo;
pub use mock_tracker::MockTrackerService;

use backport_pr::types::{CommitInfo, IssueBackport, PrState, PullRequest, TrackerIssue};

/// Commit with a one-line message
pub fn make_commit(sha: &str, subject: &str) -> CommitInfo {
    CommitInfo {
        sha: sha.to_string(),
        message: format!("{subject}\n\nSigned-off-by: Dev <dev@example.com>"),
    }
}

/// Merged PR into master with one commit `c<number>`
pub fn make_pr(number: u64) -> PullRequest {
    PullRequest {
        number,
        title: format!("mgr/cephadm: change {number}"),
        body: Some(String::new()),
        merged: true,
        state: PrState::Merged,
        base: "master".to_string(),
        merged_at: None,
        html_url: format!("https://github.com/ceph/ceph/pull/{number}"),
        labels: vec!["cephadm".to_string()],
        issues: vec![],
        commits: vec![make_commit(&format!("c{number}"), &format!("change {number}"))],
    }
}

/// Open (unmerged) PR
pub fn make_open_pr(number: u64) -> PullRequest {
    PullRequest {
        merged: false,
        state: PrState::Open,
        ..make_pr(number)
    }
}

/// PR linked to tracker issues
pub fn with_issues(mut pr: PullRequest, issues: &[&str]) -> PullRequest {
    pr.issues = issues.iter().map(ToString::to_string).collect();
    pr
}

/// Tracker issue with backports given as (branch, resolved)
pub fn make_issue(id: &str, backports: &[(&str, bool)]) -> TrackerIssue {
    TrackerIssue {
        id: id.to_string(),
        subject: format!("issue {id}"),
        status: "Pending Backport".to_string(),
        linked_pr: None,
        backports: backports
            .iter()
            .enumerate()
            .map(|(i, (branch, resolved))| IssueBackport {
                id: format!("{id}{i}"),
                branch: (*branch).to_string(),
                status: if *resolved { "Resolved" } else { "New" }.to_string(),
                resolved: *resolved,
            })
            .collect(),
    }
}
