//! Error type shared by the git and GitHub layers

use thiserror::Error;

/// Any failure reported by an external collaborator: the `git` binary or the
/// GitHub REST endpoint.
///
/// Merge conflicts, missing refs and network errors all land here without
/// further classification; callers decide what to do with them.
#[derive(Error, Debug)]
pub enum ExternalCommandError {
    /// The process could not be started at all
    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    /// The process ran but exited non-zero
    #[error("`{command}` exited with {}", exit_code_label(.code))]
    Exit {
        command: String,
        code: Option<i32>,
        /// Combined stdout/stderr, when the invocation captured it
        output: Option<String>,
    },

    /// Organization and repository could not be derived from a clone URL
    #[error("cannot derive organization and repository from clone URL: {url}")]
    InvalidCloneUrl { url: String },

    /// Building or sending an HTTP request failed
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        source: reqwest::Error,
    },

    /// The API answered with a non-success status
    #[error("request to {url} returned {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
}

impl ExternalCommandError {
    /// Exit code of the failed process, if it exited normally
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::Exit { code, .. } => *code,
            _ => None,
        }
    }

    /// Captured output attached to the failure, if any
    pub fn output(&self) -> Option<&str> {
        match self {
            Self::Exit { output, .. } => output.as_deref(),
            _ => None,
        }
    }
}

fn exit_code_label(code: &Option<i32>) -> String {
    match *code {
        Some(code) => format!("exit code {}", code),
        None => "no exit code (terminated by signal)".to_string(),
    }
}
