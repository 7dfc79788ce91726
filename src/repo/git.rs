//! [`RepoOps`] backed by the `git` executable

use super::{CherryPickOutcome, CommitPresence, RepoOps};
use crate::error::{Error, Result};
use crate::types::CommitInfo;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tracing::debug;

/// A git working tree
#[derive(Debug, Clone)]
pub struct GitRepo {
    dir: PathBuf,
}

impl GitRepo {
    /// Open the working tree containing `dir`
    pub fn open(dir: &Path) -> Result<Self> {
        let repo = Self {
            dir: dir.to_path_buf(),
        };
        let top = repo.git(&["rev-parse", "--show-toplevel"]).map_err(|_| {
            Error::Git(format!("{} is not inside a git work tree", dir.display()))
        })?;
        Ok(Self {
            dir: PathBuf::from(top),
        })
    }

    /// Root of the working tree
    pub fn root(&self) -> &Path {
        &self.dir
    }

    fn run(&self, args: &[&str]) -> Result<Output> {
        debug!(args = ?args, "git");
        Command::new("git")
            .args(args)
            .current_dir(&self.dir)
            .output()
            .map_err(|e| Error::Git(format!("failed to run git: {e}")))
    }

    /// Run git and return trimmed stdout, failing on a nonzero exit
    fn git(&self, args: &[&str]) -> Result<String> {
        let output = self.run(args)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Git(format!(
                "git {} failed: {}",
                args.join(" "),
                stderr.trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Run git and report only whether it succeeded
    fn git_ok(&self, args: &[&str]) -> Result<bool> {
        Ok(self.run(args)?.status.success())
    }

    fn is_ancestor(&self, sha: &str) -> Result<bool> {
        self.git_ok(&["merge-base", "--is-ancestor", sha, "HEAD"])
    }

    fn log_mentions(&self, sha: &str) -> Result<bool> {
        let found = self.git(&[
            "log",
            "--no-merges",
            "--format=%H",
            "--fixed-strings",
            &format!("--grep=cherry picked from commit {sha}"),
            "HEAD",
        ])?;
        Ok(!found.is_empty())
    }

    fn log_has_subject(&self, subject: &str) -> Result<bool> {
        if subject.trim().is_empty() {
            return Ok(false);
        }
        let found = self.git(&[
            "log",
            "--no-merges",
            "--format=%s",
            "--fixed-strings",
            &format!("--grep={subject}"),
            "HEAD",
        ])?;
        Ok(found.lines().any(|line| line == subject))
    }

    fn conflicted_files(&self) -> Result<Vec<String>> {
        let out = self.git(&["diff", "--name-only", "--diff-filter=U"])?;
        Ok(out.lines().map(str::to_string).collect())
    }
}

impl RepoOps for GitRepo {
    fn current_branch(&self) -> Result<String> {
        let branch = self.git(&["rev-parse", "--abbrev-ref", "HEAD"])?;
        if branch == "HEAD" {
            return Err(Error::Git(
                "HEAD is detached; check out a branch or pass --branch".to_string(),
            ));
        }
        Ok(branch)
    }

    fn branch_exists(&self, branch: &str) -> Result<bool> {
        self.git_ok(&[
            "show-ref",
            "--verify",
            "--quiet",
            &format!("refs/heads/{branch}"),
        ])
    }

    fn checkout(&self, branch: &str, create: bool) -> Result<()> {
        if create {
            self.git(&["checkout", "-b", branch])?;
        } else {
            self.git(&["checkout", branch])?;
        }
        Ok(())
    }

    fn pull(&self, remote: &str, branch: &str) -> Result<()> {
        self.git(&["pull", "--ff-only", remote, branch])?;
        Ok(())
    }

    fn commit_presence(&self, commit: &CommitInfo) -> Result<CommitPresence> {
        if self.is_ancestor(&commit.sha)? {
            debug!(sha = %commit.sha, "commit is an ancestor of HEAD");
            return Ok(CommitPresence::Picked);
        }
        if self.log_mentions(&commit.sha)? {
            debug!(sha = %commit.sha, "commit was cherry-picked before");
            return Ok(CommitPresence::Picked);
        }
        if self.log_has_subject(commit.subject())? {
            debug!(sha = %commit.sha, subject = commit.subject(), "commit subject found on HEAD");
            return Ok(CommitPresence::SameSubject);
        }
        Ok(CommitPresence::Missing)
    }

    fn topo_order(&self, shas: &[String]) -> Result<Vec<String>> {
        if shas.is_empty() {
            return Ok(Vec::new());
        }
        let mut args = vec!["rev-list", "--topo-order", "--ignore-missing"];
        args.extend(shas.iter().map(String::as_str));
        let out = self.git(&args)?;

        let wanted: HashSet<&str> = shas.iter().map(String::as_str).collect();
        let mut ordered: Vec<String> = out
            .lines()
            .map(str::trim)
            .filter(|sha| wanted.contains(sha))
            .map(str::to_string)
            .collect();
        ordered.reverse();
        Ok(ordered)
    }

    fn cherry_pick(&self, shas: &[String]) -> Result<CherryPickOutcome> {
        if shas.is_empty() {
            return Ok(CherryPickOutcome::Applied);
        }
        let mut args = vec!["cherry-pick", "-x"];
        args.extend(shas.iter().map(String::as_str));

        let output = self.run(&args)?;
        if output.status.success() {
            return Ok(CherryPickOutcome::Applied);
        }

        if self.git_ok(&["rev-parse", "-q", "--verify", "CHERRY_PICK_HEAD"])? {
            let files = self.conflicted_files()?;
            debug!(files = ?files, "cherry-pick stopped");
            return Ok(CherryPickOutcome::Conflict { files });
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(Error::Git(format!("git cherry-pick failed: {}", stderr.trim())))
    }

    fn push(&self, remote: &str, branch: &str) -> Result<()> {
        self.git(&["push", "--set-upstream", remote, branch])?;
        Ok(())
    }
}
