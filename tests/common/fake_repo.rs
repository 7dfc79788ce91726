//! In-memory git repository for driver tests

#![allow(dead_code)]

use backport_pr::error::{Error, Result};
use backport_pr::repo::{CherryPickOutcome, CommitPresence, RepoOps};
use backport_pr::types::CommitInfo;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Mutex;

#[derive(Debug, Default)]
struct FakeState {
    current: String,
    branches: BTreeSet<String>,
    applied: HashSet<String>,
    same_subject: HashSet<String>,
    conflicting: HashSet<String>,
    history: HashMap<String, usize>,
    unreachable: HashSet<String>,
    checkouts: Vec<String>,
    pulls: Vec<(String, String)>,
    cherry_picks: Vec<Vec<String>>,
    pushes: Vec<(String, String)>,
}

/// Fake [`RepoOps`] with scripted conflicts and already-applied commits
pub struct FakeRepo {
    state: Mutex<FakeState>,
}

impl FakeRepo {
    /// Repo on `current` with the given local branches
    pub fn new(current: &str, branches: &[&str]) -> Self {
        let mut state = FakeState {
            current: current.to_string(),
            ..FakeState::default()
        };
        state.branches.insert(current.to_string());
        state
            .branches
            .extend(branches.iter().map(ToString::to_string));
        Self {
            state: Mutex::new(state),
        }
    }

    /// Treat `sha` as already on the branch
    pub fn mark_applied(&self, sha: &str) {
        self.state.lock().unwrap().applied.insert(sha.to_string());
    }

    /// Put a different commit with the same subject as `sha` on the branch
    pub fn mark_same_subject(&self, sha: &str) {
        self.state
            .lock()
            .unwrap()
            .same_subject
            .insert(sha.to_string());
    }

    /// Commit history, oldest first, used by `topo_order`.
    ///
    /// Commits not listed keep their relative order after the listed ones.
    pub fn set_history(&self, shas: &[&str]) {
        self.state.lock().unwrap().history = shas
            .iter()
            .enumerate()
            .map(|(i, sha)| ((*sha).to_string(), i))
            .collect();
    }

    /// Make `topo_order` leave out `sha`
    pub fn make_unreachable(&self, sha: &str) {
        self.state
            .lock()
            .unwrap()
            .unreachable
            .insert(sha.to_string());
    }

    /// Make cherry-picking `sha` conflict
    pub fn conflict_on(&self, sha: &str) {
        self.state
            .lock()
            .unwrap()
            .conflicting
            .insert(sha.to_string());
    }

    /// Checked out branch
    pub fn current(&self) -> String {
        self.state.lock().unwrap().current.clone()
    }

    /// Branches passed to `checkout`, in order
    pub fn checkouts(&self) -> Vec<String> {
        self.state.lock().unwrap().checkouts.clone()
    }

    /// `pull` calls as (remote, branch)
    pub fn pulls(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().pulls.clone()
    }

    /// SHAs passed to each `cherry_pick` call
    pub fn cherry_picks(&self) -> Vec<Vec<String>> {
        self.state.lock().unwrap().cherry_picks.clone()
    }

    /// `push` calls as (remote, branch)
    pub fn pushes(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().pushes.clone()
    }
}

impl RepoOps for FakeRepo {
    fn current_branch(&self) -> Result<String> {
        Ok(self.current())
    }

    fn branch_exists(&self, branch: &str) -> Result<bool> {
        Ok(self.state.lock().unwrap().branches.contains(branch))
    }

    fn checkout(&self, branch: &str, create: bool) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let exists = state.branches.contains(branch);
        if create && exists {
            return Err(Error::Git(format!("branch '{branch}' already exists")));
        }
        if !create && !exists {
            return Err(Error::Git(format!("pathspec '{branch}' did not match")));
        }
        state.branches.insert(branch.to_string());
        state.current = branch.to_string();
        state.checkouts.push(branch.to_string());
        Ok(())
    }

    fn pull(&self, remote: &str, branch: &str) -> Result<()> {
        self.state
            .lock()
            .unwrap()
            .pulls
            .push((remote.to_string(), branch.to_string()));
        Ok(())
    }

    fn commit_presence(&self, commit: &CommitInfo) -> Result<CommitPresence> {
        let state = self.state.lock().unwrap();
        Ok(if state.applied.contains(&commit.sha) {
            CommitPresence::Picked
        } else if state.same_subject.contains(&commit.sha) {
            CommitPresence::SameSubject
        } else {
            CommitPresence::Missing
        })
    }

    fn topo_order(&self, shas: &[String]) -> Result<Vec<String>> {
        let state = self.state.lock().unwrap();
        let mut ordered: Vec<String> = shas
            .iter()
            .filter(|sha| !state.unreachable.contains(*sha))
            .cloned()
            .collect();
        ordered.sort_by_key(|sha| state.history.get(sha).copied().unwrap_or(usize::MAX));
        Ok(ordered)
    }

    fn cherry_pick(&self, shas: &[String]) -> Result<CherryPickOutcome> {
        let mut state = self.state.lock().unwrap();
        state.cherry_picks.push(shas.to_vec());
        for sha in shas {
            if state.conflicting.contains(sha) {
                return Ok(CherryPickOutcome::Conflict {
                    files: vec![format!("src/{sha}.py")],
                });
            }
            state.applied.insert(sha.clone());
        }
        Ok(CherryPickOutcome::Applied)
    }

    fn push(&self, remote: &str, branch: &str) -> Result<()> {
        self.state
            .lock()
            .unwrap()
            .pushes
            .push((remote.to_string(), branch.to_string()));
        Ok(())
    }
}
