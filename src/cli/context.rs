//! Shared command context for CLI commands
//!
//! Resolves config, cache location, target branch and labels once for
//! every subcommand.

use backport_pr::auth::get_github_auth;
use backport_pr::cache::{Cache, CacheStore};
use backport_pr::config::{Config, default_cache_dir};
use backport_pr::error::{Error, Result};
use backport_pr::repo::{GitRepo, RepoOps, target_from_branch};
use backport_pr::tracker::{Tracker, create_tracker};
use std::path::PathBuf;
use tracing::{debug, info};

/// Options shared by all subcommands
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    /// Explicit target branch
    pub branch: Option<String>,
    /// Label override
    pub labels: Option<Vec<String>>,
    /// Cache directory override
    pub cache_dir: Option<PathBuf>,
    /// Config file override
    pub config: Option<PathBuf>,
}

/// Shared context for CLI commands
pub struct CommandContext {
    /// Loaded configuration
    pub config: Config,
    /// Cache files location
    pub store: CacheStore,
    /// Release branch being worked on
    pub target_branch: String,
    /// Labels used for searching and cache naming
    pub labels: Vec<String>,
    /// Git repo, when the current directory is inside one
    repo: Option<GitRepo>,
}

impl CommandContext {
    /// Create a new command context
    ///
    /// The git repository is only required when `--branch` is not given.
    pub fn new(options: &GlobalOptions) -> Result<Self> {
        let config = Config::load(options.config.as_deref())?;
        let labels = config.effective_labels(options.labels.as_deref());

        let cache_dir = match &options.cache_dir {
            Some(dir) => dir.clone(),
            None => default_cache_dir().ok_or_else(|| {
                Error::Config("cannot determine cache directory; pass --cache-dir".to_string())
            })?,
        };
        let store = CacheStore::new(cache_dir, &config.effective_labels(None));

        let cwd = std::env::current_dir()?;
        let repo = GitRepo::open(&cwd).ok();

        let target_branch = match &options.branch {
            Some(branch) => branch.clone(),
            None => {
                let repo = repo.as_ref().ok_or_else(|| {
                    Error::Git("not inside a git repository; pass --branch".to_string())
                })?;
                target_from_branch(&repo.current_branch()?).to_string()
            }
        };
        config.check_target_branch(&target_branch)?;

        debug!(
            target = %target_branch,
            labels = ?labels,
            cache = %store.dir().display(),
            "command context"
        );
        Ok(Self {
            config,
            store,
            target_branch,
            labels,
            repo,
        })
    }

    /// The git repository of the current directory
    pub fn repo(&self) -> Result<&GitRepo> {
        self.repo
            .as_ref()
            .ok_or_else(|| Error::Git("not inside a git repository".to_string()))
    }

    /// Load the cached snapshot for the target branch, if any
    pub fn load_cache(&self) -> Result<Option<Cache>> {
        self.store.load(&self.target_branch, &self.labels)
    }

    /// Load the cached snapshot, failing if `search` never ran
    pub fn require_cache(&self) -> Result<Cache> {
        self.load_cache()?.ok_or_else(|| Error::CacheMissing {
            branch: self.target_branch.clone(),
        })
    }

    /// Tracker using GitHub credentials when available
    pub fn tracker(&self) -> Result<Tracker> {
        let auth = match get_github_auth() {
            Ok(auth) => {
                debug!(source = %auth.source, "using GitHub token");
                Some(auth)
            }
            Err(e) => {
                info!(error = %e, "no GitHub token, using anonymous access");
                None
            }
        };
        create_tracker(&self.config, auth.as_ref())
    }

    /// Tracker that must be authenticated (for write operations)
    pub fn authenticated_tracker(&self) -> Result<Tracker> {
        let auth = get_github_auth()?;
        debug!(source = %auth.source, "using GitHub token");
        create_tracker(&self.config, Some(&auth))
    }

    /// Tracker for issue lookups only; never asks for credentials
    pub fn issue_tracker(&self) -> Result<Tracker> {
        create_tracker(&self.config, None)
    }
}
