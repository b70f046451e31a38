//! Feed loading and parsing.
//!
//! The feed document is fetched over the same [`HttpClient`] as the article
//! pages and handed to `feed-rs`, which understands RSS, Atom and JSON Feed.
//! Failures surface as [`AppError::FeedParse`]; the pipeline treats those as
//! an empty channel rather than a failed request.

use crate::error::{AppError, Result};
use crate::fetcher::{BatchFetcher, HttpClient};
use crate::models::{FeedEntry, FetchTarget, ParsedFeed};
use feed_rs::model::Entry;
use feed_rs::parser;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Fetch and parse the feed at `url`.
#[instrument(level = "info", skip_all, fields(%url))]
pub async fn load_feed<C: HttpClient>(
    client: &C,
    url: &FetchTarget,
    timeout: Duration,
) -> Result<ParsedFeed> {
    let result = BatchFetcher::new(client, 1).fetch_one(url, timeout).await;
    if !result.success {
        return Err(AppError::FeedParse(format!(
            "fetching feed failed (status {}): {}",
            result.http_status,
            result.error.unwrap_or_default()
        )));
    }
    parse_feed(result.body.as_bytes())
}

/// Parse a feed document into entries, preserving document order.
pub fn parse_feed(bytes: &[u8]) -> Result<ParsedFeed> {
    let feed = parser::parse(bytes).map_err(|e| AppError::FeedParse(e.to_string()))?;

    let title = feed
        .title
        .map(|t| t.content.trim().to_string())
        .filter(|t| !t.is_empty());
    let entries: Vec<FeedEntry> = feed.entries.into_iter().map(entry_from_model).collect();

    info!(count = entries.len(), title = title.as_deref().unwrap_or(""), "Parsed feed");
    Ok(ParsedFeed { title, entries })
}

fn entry_from_model(entry: Entry) -> FeedEntry {
    let link = entry
        .links
        .iter()
        .find(|l| l.rel.as_deref().is_none_or(|rel| rel == "alternate"))
        .or_else(|| entry.links.first())
        .map(|l| l.href.clone())
        .unwrap_or_default();

    let content = entry
        .content
        .as_ref()
        .and_then(|c| c.body.clone())
        .filter(|body| !body.trim().is_empty());
    let content_type = entry
        .content
        .as_ref()
        .map(|c| c.content_type.essence_str().to_string());

    let description = entry
        .summary
        .map(|s| s.content)
        .filter(|s| !s.trim().is_empty())
        .or_else(|| content.clone())
        .unwrap_or_default();

    let enclosure_type = entry
        .media
        .iter()
        .flat_map(|m| m.content.iter())
        .find_map(|c| c.content_type.as_ref())
        .map(|mime| mime.essence_str().to_string());

    let published = entry.published.or(entry.updated).map(|dt| dt.timestamp());

    let mapped = FeedEntry {
        title: entry.title.map(|t| t.content).unwrap_or_default(),
        link,
        description,
        content,
        id: Some(entry.id).filter(|id| !id.is_empty()),
        published,
        enclosure_type,
        content_type,
    };
    debug!(link = %mapped.link, "Mapped feed entry");
    mapped
}
