//! Authenticated requests against the GitHub REST API

use reqwest::blocking::{Client, Request};
use reqwest::header::{ACCEPT, CONTENT_TYPE, USER_AGENT};
use tracing::{debug, warn};

use super::Comment;
use crate::config::Config;
use crate::error::ExternalCommandError;

pub const MEDIA_TYPE: &str = "application/vnd.github.v3+json";
pub const JSON_CONTENT_TYPE: &str = "application/json";
pub const AGENT: &str = "rebasebot";

/// Builds requests for the configured endpoint and evaluates mentions.
///
/// Holds a single shared HTTP client. Certificate validation stays on unless
/// the configuration explicitly opts out.
pub struct GitHubClient<'a> {
    config: &'a Config,
    http: Client,
}

impl<'a> GitHubClient<'a> {
    pub fn new(config: &'a Config) -> Result<Self, ExternalCommandError> {
        if config.insecure_skip_tls_verify {
            warn!(
                endpoint = %config.github_endpoint,
                "TLS certificate verification is disabled for GitHub API requests"
            );
        }

        let http = Client::builder()
            .danger_accept_invalid_certs(config.insecure_skip_tls_verify)
            .build()
            .map_err(|source| ExternalCommandError::Request {
                url: config.github_endpoint.clone(),
                source,
            })?;

        Ok(Self::with_http_client(config, http))
    }

    /// Use an existing HTTP client instead of building one
    pub fn with_http_client(config: &'a Config, http: Client) -> Self {
        Self { config, http }
    }

    /// The shared client, for executing requests built by [`Self::request`]
    pub fn http_client(&self) -> &Client {
        &self.http
    }

    /// A GET request for `<endpoint><path>` with auth and API headers set
    pub fn request(&self, path: &str) -> Result<Request, ExternalCommandError> {
        let url = format!("{}{}", self.config.github_endpoint, path);

        self.http
            .get(&url)
            .basic_auth(&self.config.username, Some(&self.config.password))
            .header(ACCEPT, MEDIA_TYPE)
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
            .header(USER_AGENT, AGENT)
            .build()
            .map_err(|source| ExternalCommandError::Request { url, source })
    }

    /// Whether `@<username>` appears anywhere in the comment body.
    ///
    /// Plain case-sensitive substring match: `@bots` counts as a mention of
    /// `bot`.
    pub fn was_mentioned(&self, comment: &Comment) -> bool {
        was_mentioned(&self.config.username, comment)
    }

    /// Fetch and decode the comment list at `path`
    pub fn fetch_comments(&self, path: &str) -> Result<Vec<Comment>, ExternalCommandError> {
        let request = self.request(path)?;
        let url = request.url().to_string();

        debug!(%url, "github.comments.fetch");

        let response = self
            .http
            .execute(request)
            .map_err(|source| ExternalCommandError::Request {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExternalCommandError::Status { url, status });
        }

        response
            .json::<Vec<Comment>>()
            .map_err(|source| ExternalCommandError::Request { url, source })
    }
}

/// Whether `comment` mentions `username`
pub fn was_mentioned(username: &str, comment: &Comment) -> bool {
    comment.body.contains(&format!("@{}", username))
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::AUTHORIZATION;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::sync::mpsc;
    use std::thread;

    fn test_config(endpoint: &str) -> Config {
        let endpoint = endpoint.to_string();
        Config::from_lookup(|key| match key {
            "GITHUB_USERNAME" => Some("bot".to_string()),
            "GITHUB_PASSWORD" => Some("secret".to_string()),
            "GITHUB_ENDPOINT" => Some(endpoint.clone()),
            _ => None,
        })
    }

    #[test]
    fn test_request_headers() {
        let config = test_config("https://api.github.example.com");
        let client = GitHubClient::new(&config).unwrap();

        let request = client.request("/repos/acme/widgets/issues/7/comments").unwrap();

        assert_eq!(request.method(), &reqwest::Method::GET);
        assert_eq!(
            request.url().as_str(),
            "https://api.github.example.com/repos/acme/widgets/issues/7/comments"
        );

        let headers = request.headers();
        assert_eq!(headers[ACCEPT], "application/vnd.github.v3+json");
        assert_eq!(headers[CONTENT_TYPE], "application/json");
        assert_eq!(headers[USER_AGENT], "rebasebot");
        assert_eq!(headers[AUTHORIZATION], "Basic Ym90OnNlY3JldA==");
    }

    #[test]
    fn test_malformed_endpoint_is_an_error() {
        let config = test_config("");
        let client = GitHubClient::new(&config).unwrap();

        let err = client.request("/repos/acme/widgets").unwrap_err();
        assert!(matches!(err, ExternalCommandError::Request { .. }));
    }

    #[test]
    fn test_insecure_client_still_builds() {
        let mut config = test_config("https://github.internal");
        config.insecure_skip_tls_verify = true;
        assert!(GitHubClient::new(&config).is_ok());
    }

    #[test]
    fn test_was_mentioned() {
        let config = test_config("https://api.github.com");
        let client = GitHubClient::new(&config).unwrap();

        assert!(client.was_mentioned(&Comment::with_body("hey @bot please check")));
        assert!(!client.was_mentioned(&Comment::with_body("hey bot please check")));
        assert!(!client.was_mentioned(&Comment::with_body("hey @Bot please check")));
    }

    #[test]
    fn test_mention_is_plain_substring() {
        // No word-boundary handling: a longer handle still contains the mention
        assert!(was_mentioned("bot", &Comment::with_body("hey @bots please check")));
        assert!(was_mentioned("bot", &Comment::with_body("`@bot`")));
        assert!(!was_mentioned("bot", &Comment::with_body("")));
    }

    fn local_client(config: &Config) -> GitHubClient<'_> {
        let http = Client::builder().no_proxy().build().unwrap();
        GitHubClient::with_http_client(config, http)
    }

    /// Serve a single canned HTTP response and hand back the request head
    fn serve_once(status_line: &'static str, body: &'static str) -> (String, mpsc::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let endpoint = format!("http://{}", listener.local_addr().unwrap());
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut head = String::new();
            loop {
                let mut line = String::new();
                if reader.read_line(&mut line).unwrap() == 0 || line == "\r\n" {
                    break;
                }
                head.push_str(&line);
            }

            write!(
                stream,
                "{}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            )
            .unwrap();
            let _ = tx.send(head);
        });

        (endpoint, rx)
    }

    #[test]
    fn test_fetch_comments() {
        let (endpoint, head_rx) = serve_once(
            "HTTP/1.1 200 OK",
            r#"[{"id": 1, "body": "@bot rebase please", "user": {"login": "octocat"}},
                {"id": 2, "body": "unrelated"}]"#,
        );
        let config = test_config(&endpoint);
        let client = local_client(&config);

        let comments = client.fetch_comments("/repos/acme/widgets/issues/7/comments").unwrap();
        let mentioned: Vec<_> = comments.iter().filter(|c| client.was_mentioned(c)).collect();

        assert_eq!(comments.len(), 2);
        assert_eq!(mentioned.len(), 1);
        assert_eq!(mentioned[0].author(), Some("octocat"));

        let head = head_rx.recv().unwrap().to_lowercase();
        assert!(head.starts_with("get /repos/acme/widgets/issues/7/comments "));
        assert!(head.contains("user-agent: rebasebot"));
        assert!(head.contains("authorization: basic ym90onnly3jlda=="));
    }

    #[test]
    fn test_fetch_comments_error_status() {
        let (endpoint, _head_rx) = serve_once("HTTP/1.1 404 Not Found", r#"{"message": "Not Found"}"#);
        let config = test_config(&endpoint);
        let client = local_client(&config);

        let err = client.fetch_comments("/repos/acme/missing/issues/1/comments").unwrap_err();
        match err {
            ExternalCommandError::Status { status, .. } => assert_eq!(status.as_u16(), 404),
            other => panic!("unexpected error: {other}"),
        }
    }
}
