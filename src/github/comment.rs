//! Comment payloads returned by the GitHub API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// An issue, pull request or review comment.
///
/// Only `body` is needed for mention detection; the rest is kept for callers
/// that want to report on what they found.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    #[serde(default)]
    pub id: Option<u64>,

    /// Markdown text of the comment
    #[serde(deserialize_with = "null_as_empty")]
    pub body: String,

    #[serde(default)]
    pub user: Option<User>,

    #[serde(default)]
    pub html_url: Option<String>,

    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Comment {
    /// A comment with only a body
    pub fn with_body(body: impl Into<String>) -> Self {
        Self {
            id: None,
            body: body.into(),
            user: None,
            html_url: None,
            created_at: None,
            updated_at: None,
        }
    }

    /// Login of the author, if the payload included one
    pub fn author(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.login.as_str())
    }
}

// GitHub sends `"body": null` for comments that were emptied
fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub login: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_api_comment() {
        let json = r#"{
            "id": 1,
            "body": "@rebasebot rebase",
            "user": { "login": "octocat", "id": 583231 },
            "html_url": "https://github.com/acme/widgets/pull/7#issuecomment-1",
            "created_at": "2011-04-14T16:00:49Z",
            "updated_at": "2011-04-14T16:00:49Z",
            "author_association": "MEMBER"
        }"#;

        let comment: Comment = serde_json::from_str(json).unwrap();
        assert_eq!(comment.id, Some(1));
        assert_eq!(comment.body, "@rebasebot rebase");
        assert_eq!(comment.author(), Some("octocat"));
        assert_eq!(
            comment.created_at.unwrap().to_rfc3339(),
            "2011-04-14T16:00:49+00:00"
        );
    }

    #[test]
    fn test_deserialize_minimal_comment() {
        let comment: Comment = serde_json::from_str(r#"{"body": "lgtm"}"#).unwrap();
        assert_eq!(comment, Comment::with_body("lgtm"));
        assert_eq!(comment.author(), None);

        let comment: Comment = serde_json::from_str(r#"{"id": 2, "body": null}"#).unwrap();
        assert_eq!(comment.body, "");
    }

    #[test]
    fn test_body_is_required() {
        let err = serde_json::from_str::<Comment>(r#"{"id": 3}"#).unwrap_err();
        assert!(err.to_string().contains("body"));
    }
}
