//! Working-copy operations using git CLI

use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use super::url::repository_destination;
use crate::config::Config;
use crate::error::ExternalCommandError;
use crate::executor::{CommandRunner, GitCli, OutputBuffer};

/// Remote every working copy is fetched from and pushed to
pub const DEFAULT_REMOTE: &str = "origin";

/// Check whether a working copy (or any path) exists on disk
pub fn exists(path: &Path) -> bool {
    path.exists()
}

/// Runs git against working copies under the configured clone root.
///
/// Each method maps to exactly one git invocation and logs a `started` event
/// followed by either `finished` or `failed`. Nothing is retried.
pub struct GitClient<'a, R: CommandRunner = GitCli> {
    config: &'a Config,
    runner: R,
}

impl<'a> GitClient<'a> {
    /// Create a client backed by the `git` binary on `PATH`
    pub fn new(config: &'a Config) -> Self {
        Self::with_runner(config, GitCli::new())
    }
}

impl<'a, R: CommandRunner> GitClient<'a, R> {
    /// Create a client backed by a custom command runner
    pub fn with_runner(config: &'a Config, runner: R) -> Self {
        Self { config, runner }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Run one git command in `path`, logging `<event>.started`/`finished`/`failed`
    fn run_logged(
        &self,
        event: &str,
        path: &Path,
        detail: &str,
        args: &[&str],
    ) -> Result<(), ExternalCommandError> {
        info!(repo = %path.display(), detail, "{}.started", event);

        if let Err(err) = self.runner.run(args, Some(path)) {
            error!(repo = %path.display(), detail, error = %err, "{}.failed", event);
            return Err(err);
        }

        info!(repo = %path.display(), detail, "{}.finished", event);
        Ok(())
    }

    /// Clone `clone_url` to `<root>/<org>/<repo>` and return that path.
    ///
    /// Only the destination is logged; the URL may carry credentials.
    pub fn clone_repository(&self, clone_url: &str) -> Result<PathBuf, ExternalCommandError> {
        let destination = repository_destination(&self.config.repo_parent_dir, clone_url)?;
        let destination_arg = destination.to_string_lossy();

        info!(repo = %destination.display(), "git.clone.started");

        if let Err(err) = self
            .runner
            .run(&["clone", clone_url, destination_arg.as_ref()], None)
        {
            error!(repo = %destination.display(), error = %err, "git.clone.failed");
            return Err(err);
        }

        info!(repo = %destination.display(), "git.clone.finished");
        Ok(destination)
    }

    /// Fetch from the default remote
    pub fn fetch(&self, path: &Path) -> Result<(), ExternalCommandError> {
        self.run_logged("git.fetch", path, DEFAULT_REMOTE, &["fetch", DEFAULT_REMOTE])
    }

    /// Check out a branch, tag or commit
    pub fn checkout(&self, path: &Path, git_ref: &str) -> Result<(), ExternalCommandError> {
        self.run_logged("git.checkout", path, git_ref, &["checkout", git_ref])
    }

    /// Hard reset to `target`, discarding local changes
    pub fn reset(&self, path: &Path, target: &str) -> Result<(), ExternalCommandError> {
        self.run_logged("git.reset", path, target, &["reset", "--hard", target])
    }

    /// Rebase the current branch onto `base_branch`.
    ///
    /// A failed rebase is always followed by `git rebase --abort` so the
    /// working copy is left clean. The rebase error is returned regardless of
    /// whether the abort succeeds.
    pub fn rebase(&self, path: &Path, base_branch: &str) -> Result<(), ExternalCommandError> {
        let mut output = OutputBuffer::new();

        info!(repo = %path.display(), base = base_branch, "git.rebase.started");

        let result = self
            .runner
            .run_captured(&["rebase", base_branch], Some(path), &mut output);

        let Err(err) = result else {
            info!(repo = %path.display(), base = base_branch, "git.rebase.finished");
            return Ok(());
        };

        error!(repo = %path.display(), base = base_branch, error = %err, "git.rebase.failed");
        warn!(
            repo = %path.display(),
            truncated = output.is_truncated(),
            output = output.as_str(),
            "git.rebase.abort.started"
        );

        match self.runner.run(&["rebase", "--abort"], Some(path)) {
            Ok(()) => info!(repo = %path.display(), "git.rebase.abort.finished"),
            Err(abort_err) => {
                error!(repo = %path.display(), error = %abort_err, "git.rebase.abort.failed")
            }
        }

        Err(err)
    }

    /// Drop remote-tracking refs that no longer exist on the default remote
    pub fn prune(&self, path: &Path) -> Result<(), ExternalCommandError> {
        self.run_logged(
            "git.remote.prune",
            path,
            DEFAULT_REMOTE,
            &["remote", "prune", DEFAULT_REMOTE],
        )
    }

    /// Force-push `branch` to the default remote
    pub fn push(&self, path: &Path, branch: &str) -> Result<(), ExternalCommandError> {
        self.run_logged(
            "git.push",
            path,
            branch,
            &["push", "--force", DEFAULT_REMOTE, branch],
        )
    }

    /// Set a repository-local configuration value
    pub fn config(&self, path: &Path, key: &str, value: &str) -> Result<(), ExternalCommandError> {
        let detail = format!("{}={}", key, value);
        self.run_logged("git.config", path, &detail, &["config", key, value])
    }

    /// Write the bot's author identity into the working copy's config
    pub fn configure_identity(&self, path: &Path) -> Result<(), ExternalCommandError> {
        self.config(path, "user.name", &self.config.git_name)?;
        self.config(path, "user.email", &self.config.git_email)
    }
}
