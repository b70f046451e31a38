//! Data models flowing through the full-text pipeline.
//!
//! This module defines the core data structures used throughout the application:
//! - [`FeedEntry`]: One entry as produced by the feed parser (read-only)
//! - [`ParsedFeed`]: Channel title plus the ordered entries of a feed
//! - [`FetchTarget`]: A validated absolute `http(s)` URL queued for retrieval
//! - [`FetchResult`]: The outcome of fetching one [`FetchTarget`]
//! - [`EnrichedEntry`] / [`EnrichedFeed`]: The per-request output

use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// A single feed entry as handed over by the feed parser.
///
/// Instances are read once per request and never mutated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedEntry {
    /// The entry headline.
    pub title: String,
    /// The raw article link, before normalization.
    pub link: String,
    /// The summary as published by the feed (HTML or text).
    pub description: String,
    /// Rendered full content, when the feed carries one (`content:encoded`, Atom `content`).
    pub content: Option<String>,
    /// Globally-unique id, if the feed declares one.
    pub id: Option<String>,
    /// Publication time in seconds since the epoch.
    pub published: Option<i64>,
    /// MIME type of the first enclosure.
    pub enclosure_type: Option<String>,
    /// MIME type declared on the entry content itself.
    pub content_type: Option<String>,
}

/// A parsed feed: channel title plus entries in document order.
#[derive(Debug, Clone, Default)]
pub struct ParsedFeed {
    pub title: Option<String>,
    pub entries: Vec<FeedEntry>,
}

/// A normalized URL that is known to be an absolute `http`/`https` URL.
///
/// The only way to build one is [`FetchTarget::parse`], so a value of this
/// type is never empty and never relative.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct FetchTarget(String);

impl FetchTarget {
    /// Validate `raw` as a well-formed absolute `http(s)` URL with a host.
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.is_empty() || raw.chars().any(char::is_whitespace) {
            return None;
        }
        let parsed = Url::parse(raw).ok()?;
        match parsed.scheme() {
            "http" | "https" => {}
            _ => return None,
        }
        match parsed.host_str() {
            Some(host) if !host.is_empty() => Some(Self(raw.to_string())),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FetchTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of fetching one [`FetchTarget`].
///
/// `success` implies `http_status` in `[200, 400)` and a non-empty `body`.
/// Every constructor upholds that.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResult {
    pub url: FetchTarget,
    pub success: bool,
    /// Observed HTTP status, `0` when no response was received.
    pub http_status: u16,
    /// Raw HTML, empty on failure.
    pub body: String,
    pub error: Option<String>,
}

impl FetchResult {
    /// Classify a completed HTTP exchange.
    pub fn from_status(url: FetchTarget, http_status: u16, body: String) -> Self {
        if !(200..400).contains(&http_status) {
            return Self::failure(url, http_status, format!("HTTP status {http_status}"));
        }
        if body.is_empty() {
            return Self::failure(url, http_status, "empty response body");
        }
        Self {
            url,
            success: true,
            http_status,
            body,
            error: None,
        }
    }

    pub fn failure(url: FetchTarget, http_status: u16, error: impl Into<String>) -> Self {
        Self {
            url,
            success: false,
            http_status,
            body: String::new(),
            error: Some(error.into()),
        }
    }
}

/// A feed entry with its extracted (or fallback) content.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedEntry {
    #[serde(flatten)]
    pub entry: FeedEntry,
    /// Extracted article HTML, or the original description when extraction produced nothing.
    pub content_html: String,
    /// Lower-cased MIME type from the content type inferer.
    pub mime_type: String,
}

/// Everything the feed assembler needs for one response.
#[derive(Debug, Clone, Serialize)]
pub struct EnrichedFeed {
    pub title: Option<String>,
    /// The (normalized) feed URL the channel was built from.
    pub link: String,
    pub entries: Vec<EnrichedEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(s: &str) -> FetchTarget {
        FetchTarget::parse(s).unwrap()
    }

    #[test]
    fn test_fetch_target_accepts_http_and_https() {
        assert!(FetchTarget::parse("https://example.com/a").is_some());
        assert!(FetchTarget::parse("http://example.com").is_some());
    }

    #[test]
    fn test_fetch_target_rejects_non_web_urls() {
        assert!(FetchTarget::parse("").is_none());
        assert!(FetchTarget::parse("example.com/a").is_none());
        assert!(FetchTarget::parse("ftp://example.com/a").is_none());
        assert!(FetchTarget::parse("mailto:someone@example.com").is_none());
        assert!(FetchTarget::parse("https://exa mple.com").is_none());
    }

    #[test]
    fn test_fetch_result_success_requires_status_and_body() {
        let ok = FetchResult::from_status(target("https://a.example/"), 200, "<p>x</p>".into());
        assert!(ok.success);
        assert_eq!(ok.error, None);

        let redirect_range = FetchResult::from_status(target("https://a.example/"), 304, "x".into());
        assert!(redirect_range.success);

        let empty = FetchResult::from_status(target("https://a.example/"), 200, String::new());
        assert!(!empty.success);
        assert_eq!(empty.http_status, 200);

        let server_error = FetchResult::from_status(target("https://a.example/"), 500, "oops".into());
        assert!(!server_error.success);
        assert_eq!(server_error.http_status, 500);
        assert!(server_error.body.is_empty());
        assert_eq!(server_error.error.as_deref(), Some("HTTP status 500"));
    }

    #[test]
    fn test_enriched_entry_serializes_flat() {
        let enriched = EnrichedEntry {
            entry: FeedEntry {
                title: "Hello".into(),
                link: "https://example.com/a".into(),
                ..Default::default()
            },
            content_html: "<p>Body</p>".into(),
            mime_type: "text/html".into(),
        };
        let json = serde_json::to_string(&enriched).unwrap();
        assert!(json.contains("\"title\":\"Hello\""));
        assert!(json.contains("\"content_html\":\"<p>Body</p>\""));
    }
}
