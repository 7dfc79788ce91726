//! Redmine issue tracker implementation
//!
//! A tracker issue records its backports as `copied_to` relations pointing
//! at backport issues whose subject starts with `<branch>:`.

use super::{RetryPolicy, with_retry};
use crate::error::{Error, Result};
use crate::types::{IssueBackport, TrackerIssue};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;
use url::Url;

/// Default request timeout in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Relation type Redmine uses for backport copies
const COPIED_TO: &str = "copied_to";

/// Custom field holding the PR that fixes an issue
const PULL_REQUEST_FIELD: &str = "Pull request ID";

/// Status names counted as done when the tracker doesn't send `is_closed`
const RESOLVED_STATUSES: [&str; 2] = ["Resolved", "Closed"];

#[derive(Deserialize)]
struct IssueEnvelope {
    issue: RedmineIssue,
}

#[derive(Deserialize)]
struct RedmineIssue {
    id: u64,
    subject: String,
    status: RedmineStatus,
    #[serde(default)]
    relations: Vec<Relation>,
    #[serde(default)]
    custom_fields: Vec<CustomField>,
}

#[derive(Deserialize)]
struct RedmineStatus {
    name: String,
    #[serde(default)]
    is_closed: Option<bool>,
}

impl RedmineStatus {
    fn is_resolved(&self) -> bool {
        self.is_closed
            .unwrap_or_else(|| RESOLVED_STATUSES.contains(&self.name.as_str()))
    }
}

#[derive(Deserialize)]
struct Relation {
    issue_id: u64,
    issue_to_id: u64,
    relation_type: String,
}

#[derive(Deserialize)]
struct CustomField {
    name: String,
    #[serde(default)]
    value: Option<serde_json::Value>,
}

impl RedmineIssue {
    fn linked_pr(&self) -> Option<u64> {
        let value = self
            .custom_fields
            .iter()
            .find(|f| f.name == PULL_REQUEST_FIELD)?
            .value
            .as_ref()?;
        match value {
            serde_json::Value::String(s) => s.trim().parse().ok(),
            serde_json::Value::Number(n) => n.as_u64(),
            _ => None,
        }
    }

    fn backport_ids(&self) -> Vec<u64> {
        self.relations
            .iter()
            .filter(|r| r.relation_type == COPIED_TO && r.issue_id == self.id)
            .map(|r| r.issue_to_id)
            .collect()
    }

    /// Release branch from a backport subject like `pacific: mgr/cephadm: ...`
    fn backport_branch(&self) -> Option<String> {
        let (prefix, _) = self.subject.split_once(':')?;
        let prefix = prefix.trim();
        (!prefix.is_empty() && !prefix.contains(char::is_whitespace)).then(|| prefix.to_string())
    }
}

/// Redmine service using reqwest
pub struct RedmineService {
    client: Client,
    base: Url,
    retry: RetryPolicy,
}

impl RedmineService {
    /// Create a new Redmine service for the tracker at `base_url`
    pub fn new(base_url: &str) -> Result<Self> {
        let mut base = Url::parse(base_url)
            .map_err(|e| Error::Config(format!("invalid tracker_url '{base_url}': {e}")))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .user_agent("backport-pr")
            .build()
            .map_err(|e| Error::Tracker(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base,
            retry: RetryPolicy::default(),
        })
    }

    /// Set the retry policy
    #[must_use]
    pub const fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn get_issue(&self, id: &str, with_relations: bool) -> Result<RedmineIssue> {
        let mut url = self
            .base
            .join(&format!("issues/{id}.json"))
            .map_err(|e| Error::Tracker(format!("bad issue URL for {id}: {e}")))?;
        if with_relations {
            url.set_query(Some("include=relations"));
        }

        with_retry(&self.retry, "get issue", || async {
            debug!(%url, "fetching tracker issue");
            let response = self.client.get(url.clone()).send().await?;

            if response.status() == StatusCode::NOT_FOUND {
                return Err(Error::NotFound(format!("tracker issue {id}")));
            }
            let envelope: IssueEnvelope = response.error_for_status()?.json().await?;
            Ok(envelope.issue)
        })
        .await
    }

    /// Fetch an issue and resolve the status of each of its backports
    pub async fn issue(&self, id: &str) -> Result<TrackerIssue> {
        if id.is_empty() || !id.chars().all(|c| c.is_ascii_digit()) {
            return Err(Error::InvalidInput(format!("tracker issue ID '{id}' is not numeric")));
        }

        let issue = self.get_issue(id, true).await?;

        let mut backports = Vec::new();
        for backport_id in issue.backport_ids() {
            let copy = self.get_issue(&backport_id.to_string(), false).await?;
            let Some(branch) = copy.backport_branch() else {
                debug!(id = copy.id, subject = %copy.subject, "copy is not a backport, skipping");
                continue;
            };
            backports.push(IssueBackport {
                id: copy.id.to_string(),
                branch,
                resolved: copy.status.is_resolved(),
                status: copy.status.name,
            });
        }

        debug!(id, backports = backports.len(), "fetched tracker issue");
        Ok(TrackerIssue {
            id: issue.id.to_string(),
            linked_pr: issue.linked_pr(),
            subject: issue.subject,
            status: issue.status.name,
            backports,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> RedmineIssue {
        serde_json::from_str::<IssueEnvelope>(json).unwrap().issue
    }

    #[test]
    fn test_backport_branch_from_subject() {
        let issue = parse(
            r#"{"issue": {"id": 2, "subject": "pacific: cephadm: fix upgrade", "status": {"name": "New"}}}"#,
        );
        assert_eq!(issue.backport_branch().as_deref(), Some("pacific"));

        let plain = parse(
            r#"{"issue": {"id": 3, "subject": "cephadm fails: timeout", "status": {"name": "New"}}}"#,
        );
        assert_eq!(plain.backport_branch(), None);
    }

    #[test]
    fn test_only_outgoing_copies_are_backports() {
        let issue = parse(
            r#"{"issue": {"id": 1, "subject": "x", "status": {"name": "Pending Backport"},
                "relations": [
                    {"issue_id": 1, "issue_to_id": 10, "relation_type": "copied_to"},
                    {"issue_id": 1, "issue_to_id": 11, "relation_type": "relates"},
                    {"issue_id": 9, "issue_to_id": 1, "relation_type": "copied_to"}
                ]}}"#,
        );
        assert_eq!(issue.backport_ids(), vec![10]);
    }

    #[test]
    fn test_linked_pr_from_custom_field() {
        let issue = parse(
            r#"{"issue": {"id": 1, "subject": "x", "status": {"name": "New"},
                "custom_fields": [{"id": 21, "name": "Pull request ID", "value": "38972"}]}}"#,
        );
        assert_eq!(issue.linked_pr(), Some(38972));
    }

    #[test]
    fn test_status_resolution() {
        let closed = RedmineStatus {
            name: "Rejected".to_string(),
            is_closed: Some(true),
        };
        assert!(closed.is_resolved());

        let resolved = RedmineStatus {
            name: "Resolved".to_string(),
            is_closed: None,
        };
        assert!(resolved.is_resolved());

        let in_progress = RedmineStatus {
            name: "In Progress".to_string(),
            is_closed: None,
        };
        assert!(!in_progress.is_resolved());
    }
}
