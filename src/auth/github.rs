//! GitHub token discovery

use super::AuthSource;
use crate::error::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Environment variables checked for a token, in order
const TOKEN_ENV_VARS: [&str; 2] = ["GITHUB_TOKEN", "GH_TOKEN"];

/// Token file in the home directory
const TOKEN_FILE: &str = ".github_token";

/// Resolved GitHub credentials
#[derive(Clone)]
pub struct GitHubAuthConfig {
    /// Personal access token
    pub token: String,
    /// Where the token came from
    pub source: AuthSource,
}

impl std::fmt::Debug for GitHubAuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubAuthConfig")
            .field("token", &"<redacted>")
            .field("source", &self.source)
            .finish()
    }
}

/// Find a GitHub token: env vars, then `~/.github_token`, then `gh auth token`.
pub fn get_github_auth() -> Result<GitHubAuthConfig> {
    get_github_auth_from(dirs::home_dir().as_deref(), true)
}

/// Like [`get_github_auth`] with an explicit home directory.
///
/// `use_cli` controls whether `gh auth token` is consulted.
pub fn get_github_auth_from(home: Option<&Path>, use_cli: bool) -> Result<GitHubAuthConfig> {
    for var in TOKEN_ENV_VARS {
        if let Ok(token) = std::env::var(var)
            && !token.trim().is_empty()
        {
            debug!(var, "using GitHub token from environment");
            return Ok(GitHubAuthConfig {
                token: token.trim().to_string(),
                source: AuthSource::EnvVar,
            });
        }
    }

    if let Some(path) = home.map(token_file_path)
        && let Some(token) = read_token_file(&path)?
    {
        debug!(path = %path.display(), "using GitHub token from file");
        return Ok(GitHubAuthConfig {
            token,
            source: AuthSource::TokenFile,
        });
    }

    if use_cli && let Some(token) = gh_cli_token() {
        debug!("using GitHub token from gh CLI");
        return Ok(GitHubAuthConfig {
            token,
            source: AuthSource::Cli,
        });
    }

    Err(Error::Auth(
        "no GitHub token found. Set GITHUB_TOKEN, write one to ~/.github_token, or run 'gh auth login'"
            .to_string(),
    ))
}

fn token_file_path(home: &Path) -> PathBuf {
    home.join(TOKEN_FILE)
}

fn read_token_file(path: &Path) -> Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)
        .map_err(|e| Error::Auth(format!("failed to read {}: {e}", path.display())))?;
    let token = content.trim();
    Ok((!token.is_empty()).then(|| token.to_string()))
}

fn gh_cli_token() -> Option<String> {
    let output = Command::new("gh").args(["auth", "token"]).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!token.is_empty()).then_some(token)
}
