//! User configuration
//!
//! Read from `<config dir>/backport-pr/config.toml`. Every key is optional;
//! a missing file yields [`Config::default`].

use crate::error::{Error, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

/// Directory name used under the platform config and cache dirs
const APP_DIR: &str = "backport-pr";

/// Config file name
const CONFIG_FILE: &str = "config.toml";

/// Settings for the repository being backported
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// GitHub repository owner
    pub owner: String,
    /// GitHub repository name
    pub repo: String,
    /// Branch PRs are merged into
    pub source_branch: String,
    /// Release branches backports may target (empty allows any)
    pub target_branches: Vec<String>,
    /// Labels searched for by default
    pub labels: Vec<String>,
    /// Labels copied from source PRs onto the backport PR
    pub copy_labels: Vec<String>,
    /// Only search PRs created after this date
    pub created_after: Option<NaiveDate>,
    /// Cap on search hits per label
    pub max_results_per_label: Option<usize>,
    /// Remote the release branch is pulled from
    pub upstream_remote: String,
    /// Remote the backport branch is pushed to
    pub push_remote: String,
    /// Owner of the fork the backport branch lives in
    pub fork_owner: Option<String>,
    /// Milestone number assigned to backport PRs
    pub milestone: Option<u64>,
    /// Base URL of the issue tracker
    pub tracker_url: String,
    /// GitHub Enterprise host (None for github.com)
    pub github_host: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            owner: "ceph".to_string(),
            repo: "ceph".to_string(),
            source_branch: "master".to_string(),
            target_branches: vec!["octopus".to_string(), "pacific".to_string()],
            labels: vec!["cephadm".to_string(), "orchestrator".to_string()],
            copy_labels: ["cephadm", "orchestrator", "rook", "mgr", "documentation"]
                .into_iter()
                .map(String::from)
                .collect(),
            created_after: NaiveDate::from_ymd_opt(2020, 10, 19),
            max_results_per_label: None,
            upstream_remote: "upstream".to_string(),
            push_remote: "origin".to_string(),
            fork_owner: None,
            milestone: None,
            tracker_url: "https://tracker.ceph.com".to_string(),
            github_host: None,
        }
    }
}

impl Config {
    /// Load config from `path`, or from the default location when `None`.
    ///
    /// A missing file is not an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match default_config_path() {
                Some(p) => p,
                None => return Ok(Self::default()),
            },
        };

        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .map_err(|e| Error::Config(format!("failed to read {}: {e}", path.display())))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse {}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Check required fields
    pub fn validate(&self) -> Result<()> {
        for (key, value) in [
            ("owner", &self.owner),
            ("repo", &self.repo),
            ("source_branch", &self.source_branch),
        ] {
            if value.trim().is_empty() {
                return Err(Error::Config(format!("'{key}' must not be empty")));
            }
        }
        Url::parse(&self.tracker_url)
            .map_err(|e| Error::Config(format!("invalid tracker_url '{}': {e}", self.tracker_url)))?;
        Ok(())
    }

    /// Reject target branches outside `target_branches`
    pub fn check_target_branch(&self, branch: &str) -> Result<()> {
        if branch == self.source_branch {
            return Err(Error::InvalidInput(format!(
                "'{branch}' is the source branch; check out a release branch or pass --branch"
            )));
        }
        if !self.target_branches.is_empty() && !self.target_branches.iter().any(|b| b == branch) {
            return Err(Error::InvalidInput(format!(
                "branch '{branch}' is not one of the configured target branches: {}",
                self.target_branches.join(", ")
            )));
        }
        Ok(())
    }

    /// Normalized label list: given labels, or the configured ones
    pub fn effective_labels(&self, overrides: Option<&[String]>) -> Vec<String> {
        let mut labels: Vec<String> = overrides
            .unwrap_or(&self.labels)
            .iter()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect();
        labels.sort();
        labels.dedup();
        labels
    }

    /// Head reference for a backport branch (`fork_owner:branch` if configured)
    pub fn head_ref(&self, branch: &str) -> String {
        self.fork_owner
            .as_ref()
            .map_or_else(|| branch.to_string(), |owner| format!("{owner}:{branch}"))
    }
}

/// Default path of the config file
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR).join(CONFIG_FILE))
}

/// Default directory holding cache files
pub fn default_cache_dir() -> Option<PathBuf> {
    dirs::cache_dir().map(|d| d.join(APP_DIR))
}
