//! Local snapshot of fetched pull requests
//!
//! `search` writes one [`Cache`] per target branch (and label set);
//! `crunch` and `backport` read it. A snapshot is always replaced
//! wholesale, never merged.

mod storage;

pub use storage::CacheStore;

use crate::types::PullRequest;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current cache format version
pub const CACHE_VERSION: u32 = 1;

/// One point-in-time snapshot of PRs for a target branch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cache {
    /// Format version
    #[serde(default = "default_version")]
    pub version: u32,
    /// When the snapshot was taken
    pub fetched_at: DateTime<Utc>,
    /// Branch the PRs were merged into
    pub source_branch: String,
    /// Release branch the snapshot was taken for
    pub target_branch: String,
    /// Labels used for the search
    #[serde(default)]
    pub labels: Vec<String>,
    /// Fetched PRs, ascending by number
    pub prs: Vec<PullRequest>,
}

const fn default_version() -> u32 {
    CACHE_VERSION
}

impl Cache {
    /// Build a snapshot from a completed fetch. PRs are sorted and deduplicated by number.
    pub fn new(
        source_branch: impl Into<String>,
        target_branch: impl Into<String>,
        labels: Vec<String>,
        mut prs: Vec<PullRequest>,
    ) -> Self {
        prs.sort_by_key(|pr| pr.number);
        prs.dedup_by_key(|pr| pr.number);
        Self {
            version: CACHE_VERSION,
            fetched_at: Utc::now(),
            source_branch: source_branch.into(),
            target_branch: target_branch.into(),
            labels,
            prs,
        }
    }

    /// Look up a cached PR by number
    pub fn get(&self, number: u64) -> Option<&PullRequest> {
        self.prs.iter().find(|pr| pr.number == number)
    }

    /// All cached PR numbers, ascending
    pub fn numbers(&self) -> Vec<u64> {
        self.prs.iter().map(|pr| pr.number).collect()
    }
}
