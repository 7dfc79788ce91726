//! Progress reporting hooks for long-running backports

use super::PrBackportStatus;
use crate::types::PullRequest;
use async_trait::async_trait;

/// Receives status updates while a backport runs
#[async_trait]
pub trait ProgressCallback: Send + Sync {
    /// Free-form status line
    async fn on_message(&self, message: &str);

    /// About to cherry-pick `pr`
    async fn on_pr_started(&self, _pr: &PullRequest) {}

    /// Finished processing PR `number`
    async fn on_pr_finished(&self, _number: u64, _status: &PrBackportStatus) {}
}

/// Progress callback that discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgress;

#[async_trait]
impl ProgressCallback for NoopProgress {
    async fn on_message(&self, _message: &str) {}
}
