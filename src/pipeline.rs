//! The fetch-and-enrich pipeline.
//!
//! One [`Enricher`] serves many requests; all per-request state (targets,
//! fetch results, enriched entries) lives on the stack of [`Enricher::run`].
//!
//! # Flow
//!
//! ```text
//! load_feed ─► (order by date) ─► truncate to limit ─► normalize links
//!           ─► dedupe targets ─► BatchFetcher::fetch_all ─► extract ─► EnrichedEntry
//! ```

use crate::config::Settings;
use crate::content_type;
use crate::extract::ContentExtractor;
use crate::feed::load_feed;
use crate::fetcher::{BatchFetcher, HttpClient};
use crate::models::{EnrichedEntry, EnrichedFeed, FeedEntry, FetchTarget, ParsedFeed};
use crate::normalize;
use crate::request::FeedRequest;
use crate::utils::truncate_for_log;
use itertools::Itertools;
use std::cmp::Reverse;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

#[derive(Debug)]
pub struct Enricher<C> {
    client: C,
    extractor: ContentExtractor,
    settings: Settings,
}

impl<C: HttpClient> Enricher<C> {
    pub fn new(client: C, settings: Settings) -> Self {
        Self {
            client,
            extractor: ContentExtractor::new(settings.max_parse_errors),
            settings,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Load the requested feed and enrich its entries.
    ///
    /// A feed that cannot be fetched or parsed yields an empty channel.
    #[instrument(level = "info", skip_all, fields(url = %request.url, limit = request.limit))]
    pub async fn run(&self, request: &FeedRequest) -> EnrichedFeed {
        let t0 = Instant::now();
        let ParsedFeed { title, mut entries } =
            match load_feed(&self.client, &request.url, request.timeout).await {
                Ok(feed) => feed,
                Err(e) => {
                    warn!(error = %e, "Feed unavailable; emitting empty channel");
                    ParsedFeed::default()
                }
            };

        if self.settings.order_by_date {
            entries.sort_by_key(|e| Reverse(e.published.filter(|ts| *ts > 0)));
        }

        let entries = self.enrich(entries, request.limit, request.timeout).await;
        info!(
            items = entries.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Enriched feed"
        );

        EnrichedFeed {
            title,
            link: request.url.to_string(),
            entries,
        }
    }

    /// Replace each entry's summary with the extracted article body.
    ///
    /// Output order matches input order. Entries whose link does not
    /// normalize to a valid URL are still emitted, with their description.
    pub async fn enrich(
        &self,
        entries: Vec<FeedEntry>,
        limit: usize,
        timeout: Duration,
    ) -> Vec<EnrichedEntry> {
        let entries: Vec<FeedEntry> = entries.into_iter().take(limit).collect();

        let targets: Vec<Option<FetchTarget>> = entries
            .iter()
            .map(|entry| {
                let target = normalize::to_target(&entry.link);
                if target.is_none() {
                    debug!(link = %truncate_for_log(&entry.link, 200), "Link rejected; using description");
                }
                target
            })
            .collect();

        let unique: Vec<FetchTarget> = targets.iter().flatten().cloned().unique().collect();
        let results = if unique.is_empty() {
            Default::default()
        } else {
            BatchFetcher::new(&self.client, self.settings.concurrency())
                .fetch_all(&unique, timeout)
                .await
        };

        entries
            .into_iter()
            .zip(targets)
            .map(|(entry, target)| {
                let extracted = target
                    .as_ref()
                    .and_then(|t| results.get(t))
                    .filter(|r| r.success && !r.body.is_empty())
                    .map(|r| self.extractor.extract(&r.body))
                    .unwrap_or_default();
                let content_html = pick_content(extracted, &entry);
                let mime_type = content_type::infer(&entry);
                EnrichedEntry {
                    entry,
                    content_html,
                    mime_type,
                }
            })
            .collect()
    }
}

/// Extracted text unless blank, then the description, then feed-provided content.
fn pick_content(extracted: String, entry: &FeedEntry) -> String {
    if !extracted.trim().is_empty() {
        return extracted;
    }
    if !entry.description.trim().is_empty() {
        return entry.description.clone();
    }
    entry.content.clone().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockClient, MockRoute};

    const FEED_URL: &str = "https://news.example/rss";

    fn entry(n: usize, link: &str) -> FeedEntry {
        FeedEntry {
            title: format!("Entry {n}"),
            link: link.to_string(),
            description: format!("<p>Summary {n}</p>"),
            ..Default::default()
        }
    }

    fn article(text: &str) -> String {
        format!("<html><body><nav>menu</nav><article><p>{text}</p></article></body></html>")
    }

    fn request(limit: usize) -> FeedRequest {
        FeedRequest {
            url: FetchTarget::parse(FEED_URL).unwrap(),
            limit,
            timeout: Duration::from_secs(1),
        }
    }

    fn rss(items: &[(&str, &str, Option<&str>)]) -> String {
        let body: String = items
            .iter()
            .map(|(title, link, date)| {
                let date = date.map(|d| format!("<pubDate>{d}</pubDate>")).unwrap_or_default();
                format!("<item><title>{title}</title><link>{link}</link><description>Summary of {title}</description>{date}</item>")
            })
            .collect();
        format!(r#"<?xml version="1.0"?><rss version="2.0"><channel><title>News</title><link>https://news.example/</link><description>d</description>{body}</channel></rss>"#)
    }

    #[tokio::test]
    async fn test_limit_preserves_order() {
        let client = MockClient::new()
            .page("https://a.example/1", &article("One"))
            .page("https://a.example/2", &article("Two"))
            .page("https://a.example/3", &article("Three"));
        let enricher = Enricher::new(client, Settings::default());
        let entries = vec![
            entry(1, "https://a.example/1"),
            entry(2, "https://a.example/2"),
            entry(3, "https://a.example/3"),
        ];

        let out = enricher.enrich(entries, 2, Duration::from_secs(1)).await;
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].entry.title, "Entry 1");
        assert_eq!(out[0].content_html, "<p>One</p>");
        assert_eq!(out[1].content_html, "<p>Two</p>");
        assert_eq!(out[1].mime_type, "text/html");
        assert_eq!(enricher.client.calls("https://a.example/3"), 0);
    }

    #[tokio::test]
    async fn test_failed_fetch_falls_back_to_description() {
        let client = MockClient::new()
            .route("https://a.example/1", MockRoute::Respond(500, "oops".into()));
        let enricher = Enricher::new(client, Settings::default());

        let out = enricher
            .enrich(vec![entry(1, "https://a.example/1")], 10, Duration::from_secs(1))
            .await;
        assert_eq!(out[0].content_html, "<p>Summary 1</p>");
    }

    #[tokio::test]
    async fn test_blank_extraction_falls_back_to_description() {
        let client = MockClient::new().page("https://a.example/1", "<article>   </article>");
        let enricher = Enricher::new(client, Settings::default());

        let out = enricher
            .enrich(vec![entry(1, "https://a.example/1")], 10, Duration::from_secs(1))
            .await;
        assert_eq!(out[0].content_html, "<p>Summary 1</p>");
    }

    #[tokio::test]
    async fn test_invalid_link_is_emitted_without_fetch() {
        let client = MockClient::new();
        let enricher = Enricher::new(client, Settings::default());

        let out = enricher
            .enrich(vec![entry(1, "not a link at all")], 10, Duration::from_secs(1))
            .await;
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].content_html, "<p>Summary 1</p>");
        assert_eq!(enricher.client.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_links_fetched_once() {
        let client = MockClient::new().page("https://a.example/same", &article("Shared"));
        let enricher = Enricher::new(client, Settings::default());
        let entries = vec![
            entry(1, "https://a.example/same"),
            entry(2, "feed://a.example/same"),
            entry(3, "https://agg.example/r?text=https%3A%2F%2Fa.example%2Fsame"),
        ];

        let out = enricher.enrich(entries, 10, Duration::from_secs(1)).await;
        assert!(out.iter().all(|e| e.content_html == "<p>Shared</p>"));
        assert_eq!(enricher.client.calls("https://a.example/same"), 1);
    }

    #[tokio::test]
    async fn test_run_end_to_end() {
        let feed = rss(&[
            ("A", "https://a.example/1", None),
            ("B", "https://a.example/2", None),
            ("C", "https://a.example/3", None),
        ]);
        let client = MockClient::new()
            .page(FEED_URL, &feed)
            .page("https://a.example/1", &article("Full A"))
            .route("https://a.example/2", MockRoute::Respond(500, String::new()));
        let enricher = Enricher::new(client, Settings::default());

        let out = enricher.run(&request(2)).await;
        assert_eq!(out.title.as_deref(), Some("News"));
        assert_eq!(out.link, FEED_URL);
        assert_eq!(out.entries.len(), 2);
        assert_eq!(out.entries[0].content_html, "<p>Full A</p>");
        assert_eq!(out.entries[1].content_html, "Summary of B");
    }

    #[tokio::test]
    async fn test_unparseable_feed_yields_empty_channel() {
        let client = MockClient::new().page(FEED_URL, "this is not a feed");
        let enricher = Enricher::new(client, Settings::default());

        let out = enricher.run(&request(10)).await;
        assert!(out.title.is_none());
        assert!(out.entries.is_empty());
    }

    #[tokio::test]
    async fn test_order_by_date_newest_first() {
        let feed = rss(&[
            ("Old", "https://a.example/old", Some("Mon, 02 Jun 2025 00:00:00 GMT")),
            ("Undated", "https://a.example/undated", None),
            ("New", "https://a.example/new", Some("Tue, 10 Jun 2025 00:00:00 GMT")),
        ]);
        let client = MockClient::new().page(FEED_URL, &feed);
        let settings = Settings {
            order_by_date: true,
            ..Settings::default()
        };
        let enricher = Enricher::new(client, settings);

        let out = enricher.run(&request(10)).await;
        let titles: Vec<&str> = out.entries.iter().map(|e| e.entry.title.as_str()).collect();
        assert_eq!(titles, vec!["New", "Old", "Undated"]);
    }

    #[test]
    fn test_pick_content() {
        let mut e = entry(1, "https://a.example/");
        assert_eq!(pick_content("<p>x</p>".into(), &e), "<p>x</p>");
        assert_eq!(pick_content(" \n".into(), &e), "<p>Summary 1</p>");
        e.description = String::new();
        e.content = Some("<p>body</p>".into());
        assert_eq!(pick_content(String::new(), &e), "<p>body</p>");
    }
}
