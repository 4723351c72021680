//! rebasebot - keeps pull request branches rebased
//!
//! Thin wrappers around the `git` binary for clone/fetch/rebase/push, plus
//! the little bit of GitHub API plumbing needed to notice when the bot is
//! mentioned in a comment.

pub mod config;
pub mod error;
pub mod executor;
pub mod git;
pub mod github;

pub use config::Config;
pub use error::ExternalCommandError;
