//! Deriving local paths from clone URLs

use std::path::{Path, PathBuf};

use crate::error::ExternalCommandError;

/// The last two `/`-separated segments of a clone URL: `(org, file name)`
fn trailing_segments(clone_url: &str) -> Result<(&str, &str), ExternalCommandError> {
    let mut segments = clone_url.trim_end_matches('/').rsplit('/');

    match (segments.next(), segments.next()) {
        (Some(name), Some(org)) if !name.is_empty() && !org.is_empty() => Ok((org, name)),
        _ => Err(ExternalCommandError::InvalidCloneUrl {
            url: clone_url.to_string(),
        }),
    }
}

/// Empty, `.` and `..` components would escape `<root>/<org>/<repo>`
fn checked_component<'u>(component: &'u str, clone_url: &str) -> Result<&'u str, ExternalCommandError> {
    match component {
        "" | "." | ".." => Err(ExternalCommandError::InvalidCloneUrl {
            url: clone_url.to_string(),
        }),
        _ => Ok(component),
    }
}

/// Organization (owner) segment of a clone URL
pub fn extract_org(clone_url: &str) -> Result<&str, ExternalCommandError> {
    let (org, _) = trailing_segments(clone_url)?;
    checked_component(org, clone_url)
}

/// Repository name of a clone URL: the file name up to its first `.`
pub fn extract_repo_name(clone_url: &str) -> Result<&str, ExternalCommandError> {
    let (_, name) = trailing_segments(clone_url)?;
    checked_component(name.split('.').next().unwrap_or(name), clone_url)
}

/// Where a clone of `clone_url` lives under `root`: `<root>/<org>/<repo>`
pub fn repository_destination(root: &Path, clone_url: &str) -> Result<PathBuf, ExternalCommandError> {
    let org = extract_org(clone_url)?;
    let repo = extract_repo_name(clone_url)?;
    Ok(root.join(org).join(repo))
}
