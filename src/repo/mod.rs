//! Local git repository operations
//!
//! Everything the backport driver needs from git goes through [`RepoOps`],
//! so the driver can be tested against an in-memory fake.

mod git;

pub use git::GitRepo;

use crate::error::Result;
use crate::types::CommitInfo;
use regex::Regex;
use std::sync::LazyLock;

/// Outcome of a cherry-pick
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CherryPickOutcome {
    /// All commits applied
    Applied,
    /// Cherry-pick stopped with conflicts; the repo is left mid cherry-pick
    Conflict {
        /// Paths with unresolved conflicts
        files: Vec<String>,
    },
}

/// How a commit was found on HEAD
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitPresence {
    /// Not on HEAD
    Missing,
    /// The commit itself, or a `cherry-pick -x` of it, is on HEAD
    Picked,
    /// Only a commit with the same subject line is on HEAD
    SameSubject,
}

/// Git operations used by the backport driver
pub trait RepoOps: Send + Sync {
    /// Name of the checked out branch
    fn current_branch(&self) -> Result<String>;

    /// Whether a local branch exists
    fn branch_exists(&self, branch: &str) -> Result<bool>;

    /// Check out `branch`, creating it from HEAD when `create` is set
    fn checkout(&self, branch: &str, create: bool) -> Result<()>;

    /// Fast-forward the current branch from `remote/branch`
    fn pull(&self, remote: &str, branch: &str) -> Result<()>;

    /// Whether `commit` (or a cherry-pick of it) is already on HEAD
    fn commit_presence(&self, commit: &CommitInfo) -> Result<CommitPresence>;

    /// `shas` in topological order, oldest first.
    ///
    /// Only the given commits are returned; a SHA git doesn't reach is
    /// missing from the result.
    fn topo_order(&self, shas: &[String]) -> Result<Vec<String>>;

    /// `git cherry-pick -x` the given commits in order
    fn cherry_pick(&self, shas: &[String]) -> Result<CherryPickOutcome>;

    /// Push `branch` to `remote`, setting it as upstream
    fn push(&self, remote: &str, branch: &str) -> Result<()>;
}

static BACKPORT_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.+)-backport-[\d-]+$").unwrap_or_else(|e| unreachable!("invalid regex: {e}"))
});

/// Release branch a branch name refers to.
///
/// `pacific-backport-100-102` maps to `pacific`; other names map to themselves.
pub fn target_from_branch(name: &str) -> &str {
    BACKPORT_SUFFIX
        .captures(name)
        .and_then(|caps| caps.get(1))
        .map_or(name, |m| m.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_from_backport_branch() {
        assert_eq!(target_from_branch("pacific-backport-100-102"), "pacific");
        assert_eq!(target_from_branch("octopus-backport-7"), "octopus");
    }

    #[test]
    fn test_target_from_plain_branch() {
        assert_eq!(target_from_branch("pacific"), "pacific");
        assert_eq!(target_from_branch("wip-backport-fix"), "wip-backport-fix");
        assert_eq!(target_from_branch("-backport-1"), "-backport-1");
    }
}
