//! Git operations module using the git CLI
//!
//! Provides functionality for:
//! - Cloning repositories under the configured root
//! - Fetching, resetting, rebasing and force-pushing working copies
//! - Deriving local paths from clone URLs

mod repository;
pub mod url;

pub use repository::*;
