//! Configuration management for rebasebot
//!
//! Everything is read from the process environment exactly once at startup.
//! The resulting [`Config`] is immutable and handed to each component by
//! reference.

use serde::{Serialize, Serializer};
use std::fmt;
use std::path::{Path, PathBuf};

/// Overrides the directory clones are placed under
pub const ENV_TMPDIR: &str = "TMPDIR";
pub const ENV_USERNAME: &str = "GITHUB_USERNAME";
pub const ENV_PASSWORD: &str = "GITHUB_PASSWORD";
pub const ENV_HOSTNAME: &str = "GITHUB_HOSTNAME";
pub const ENV_GIT_USER: &str = "GIT_USER";
pub const ENV_GIT_EMAIL: &str = "GIT_EMAIL";
pub const ENV_ENDPOINT: &str = "GITHUB_ENDPOINT";
pub const ENV_SECRET: &str = "SECRET";
/// Opt-in switch that disables TLS certificate verification for API calls
pub const ENV_INSECURE_SKIP_VERIFY: &str = "GITHUB_INSECURE_SKIP_VERIFY";

const REDACTED: &str = "<redacted>";

/// Process-wide configuration
#[derive(Clone, Serialize)]
pub struct Config {
    /// Root directory clones are created under (`<root>/<org>/<repo>`)
    pub repo_parent_dir: PathBuf,

    /// Hostname of the GitHub instance, used for clone URLs and noreply emails
    pub github_hostname: String,

    /// Account the bot acts as
    pub username: String,

    /// Password or token for `username`
    #[serde(serialize_with = "redact")]
    pub password: String,

    /// Author name written into rebased commits
    pub git_name: String,

    /// Author email written into rebased commits
    pub git_email: String,

    /// Base URL of the REST API (e.g. `https://api.github.com`)
    pub github_endpoint: String,

    /// Shared webhook secret
    #[serde(serialize_with = "redact")]
    pub secret: String,

    /// Skip certificate validation on the API client
    pub insecure_skip_tls_verify: bool,
}

impl Config {
    /// Load configuration from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    ///
    /// Empty values are treated the same as missing ones.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let repo_parent_dir = get(ENV_TMPDIR)
            .map(PathBuf::from)
            .unwrap_or_else(std::env::temp_dir);

        let username = get(ENV_USERNAME).unwrap_or_default();
        let github_hostname = get(ENV_HOSTNAME).unwrap_or_default();
        let git_name = get(ENV_GIT_USER).unwrap_or_else(|| username.clone());
        let git_email = get(ENV_GIT_EMAIL)
            .unwrap_or_else(|| default_email(&git_name, &github_hostname));

        Self {
            repo_parent_dir,
            github_hostname,
            password: get(ENV_PASSWORD).unwrap_or_default(),
            username,
            git_name,
            git_email,
            github_endpoint: get(ENV_ENDPOINT).unwrap_or_default(),
            secret: get(ENV_SECRET).unwrap_or_default(),
            insecure_skip_tls_verify: get(ENV_INSECURE_SKIP_VERIFY)
                .map(|v| parse_flag(&v))
                .unwrap_or(false),
        }
    }

    /// Authenticated HTTPS clone URL for `owner/name`
    pub fn clone_url(&self, repository_full_name: &str) -> String {
        format!(
            "https://{}:{}@{}/{}.git",
            self.username, self.password, self.github_hostname, repository_full_name
        )
    }

    /// Location of a repository (or any relative name) under the clone root
    pub fn repository_path(&self, name: impl AsRef<Path>) -> PathBuf {
        self.repo_parent_dir.join(name)
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("repo_parent_dir", &self.repo_parent_dir)
            .field("github_hostname", &self.github_hostname)
            .field("username", &self.username)
            .field("password", &REDACTED)
            .field("git_name", &self.git_name)
            .field("git_email", &self.git_email)
            .field("github_endpoint", &self.github_endpoint)
            .field("secret", &REDACTED)
            .field("insecure_skip_tls_verify", &self.insecure_skip_tls_verify)
            .finish()
    }
}

/// GitHub's noreply address for a user on the given host
pub fn default_email(name: &str, hostname: &str) -> String {
    format!("{}@users.noreply.{}", name, hostname)
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes"
    )
}

fn redact<S: Serializer>(value: &str, serializer: S) -> Result<S::Ok, S::Error> {
    if value.is_empty() {
        serializer.serialize_str("")
    } else {
        serializer.serialize_str(REDACTED)
    }
}
