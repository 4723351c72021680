//! Minimal GitHub REST API support: request construction and mention checks

mod client;
mod comment;

pub use client::*;
pub use comment::*;
