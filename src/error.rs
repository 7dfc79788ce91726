//! Error types for backport-pr

use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// All errors surfaced by backport-pr
#[derive(Error, Debug)]
pub enum Error {
    /// Credentials are missing or were rejected. Never retried.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// GitHub API request budget is used up. Not retried.
    #[error("GitHub API rate limit exceeded: {0}. Set GITHUB_TOKEN or wait for the limit to reset")]
    RateLimited(String),

    /// Connectivity problem talking to a remote service. Retryable.
    #[error("network error: {0}")]
    TransientNetwork(String),

    /// Remote object (PR, issue) does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Requested PR numbers are not part of the cached snapshot
    #[error(
        "PR(s) not in cache: {}. Run 'backport-pr search' to refresh it",
        format_numbers(.0)
    )]
    UnknownPr(Vec<u64>),

    /// A pull request for the same head branch already exists
    #[error("a pull request for {head} already exists")]
    Conflict {
        /// Head branch of the rejected PR
        head: String,
    },

    /// PR is not merged on the source branch
    #[error("PR #{0} is not merged [--ignore-pr-not-merged]")]
    NotMerged(u64),

    /// A commit with the same subject is already on the branch
    #[error(
        "commit {sha} of PR #{number} looks already applied (same subject on the branch) [--ignore-commit-not-merged]"
    )]
    CommitAlreadyApplied {
        /// PR the commit belongs to
        number: u64,
        /// Commit SHA
        sha: String,
    },

    /// Topological ordering returned a different set of commits
    #[error(
        "cannot order commits of PR #{number}: dropped [{}], added [{}] [--ignore-order-commit-shas-non-equal]",
        .dropped.join(", "),
        .added.join(", ")
    )]
    CommitOrderMismatch {
        /// PR the commits belong to
        number: u64,
        /// Commits missing from the ordered list
        dropped: Vec<String>,
        /// Commits the ordered list has that were not asked for
        added: Vec<String>,
    },

    /// Backport stopped before all PRs were applied
    #[error(
        "backport incomplete: cherry-pick of #{conflicted} conflicted; not attempted: [{}]",
        format_numbers(.untried)
    )]
    PartialBackport {
        /// PR whose cherry-pick conflicted
        conflicted: u64,
        /// PRs after the conflict that were not attempted
        untried: Vec<u64>,
    },

    /// No cached snapshot for the branch yet
    #[error("no cached PRs for branch '{branch}'. Run 'backport-pr search' first")]
    CacheMissing {
        /// Target branch the cache was looked up for
        branch: String,
    },

    /// GitHub API error that is neither auth nor connectivity related
    #[error("GitHub API error: {0}")]
    GitHubApi(String),

    /// Issue tracker error
    #[error("tracker error: {0}")]
    Tracker(String),

    /// Cache file could not be read or written
    #[error("cache error: {0}")]
    Cache(String),

    /// Invalid or unreadable configuration
    #[error("config error: {0}")]
    Config(String),

    /// A git command failed
    #[error("git error: {0}")]
    Git(String),

    /// Bad user input
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// IO error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether retrying the same call may succeed
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::TransientNetwork(_))
    }

    /// Process exit code for this error.
    ///
    /// Failed pre-flight checks exit with 3, everything else with 1.
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::NotMerged(_)
            | Self::CommitAlreadyApplied { .. }
            | Self::CommitOrderMismatch { .. } => 3,
            _ => 1,
        }
    }
}

fn format_numbers(numbers: &[u64]) -> String {
    numbers
        .iter()
        .map(|n| format!("#{n}"))
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<octocrab::Error> for Error {
    fn from(err: octocrab::Error) -> Self {
        match err {
            octocrab::Error::GitHub { source, .. } => {
                let status = source.status_code.as_u16();
                let message = source.message.clone();
                match status {
                    403 | 429 if is_rate_limit_message(&message) => Self::RateLimited(message),
                    401 | 403 => Self::Auth(message),
                    404 => Self::NotFound(message),
                    500..=599 => Self::TransientNetwork(format!("GitHub returned {status}: {message}")),
                    _ => Self::GitHubApi(format!("{status}: {message}")),
                }
            }
            octocrab::Error::Serde { source, .. } => {
                Self::GitHubApi(format!("unexpected response: {source}"))
            }
            octocrab::Error::Json { source, .. } => {
                Self::GitHubApi(format!("unexpected response: {source}"))
            }
            err @ (octocrab::Error::Hyper { .. } | octocrab::Error::Service { .. }) => {
                Self::TransientNetwork(err.to_string())
            }
            other => Self::GitHubApi(other.to_string()),
        }
    }
}

fn is_rate_limit_message(message: &str) -> bool {
    message.to_ascii_lowercase().contains("rate limit")
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() || err.is_request() {
            return Self::TransientNetwork(err.to_string());
        }
        match err.status().map(|s| s.as_u16()) {
            Some(401 | 403) => Self::Auth(err.to_string()),
            Some(404) => Self::NotFound(err.to_string()),
            Some(500..=599) => Self::TransientNetwork(err.to_string()),
            _ => Self::Tracker(err.to_string()),
        }
    }
}
