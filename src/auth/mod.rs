//! Authentication for GitHub
//!
//! Supports environment variables, a token file and the `gh` CLI.

mod github;

pub use github::{GitHubAuthConfig, get_github_auth, get_github_auth_from};

/// Source of authentication token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthSource {
    /// Token from environment variable
    EnvVar,
    /// Token from `~/.github_token`
    TokenFile,
    /// Token from CLI tool (gh)
    Cli,
}

impl std::fmt::Display for AuthSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EnvVar => write!(f, "environment"),
            Self::TokenFile => write!(f, "token file"),
            Self::Cli => write!(f, "gh CLI"),
        }
    }
}
