//! JSON rendering of an enriched feed, for the `convert --format json` mode.
//!
//! Entry fields are flattened next to `content_html` and `mime_type`, so a
//! consumer sees one object per item.

use crate::error::Result;
use crate::models::EnrichedFeed;
use tracing::{info, instrument};

/// Serialize `feed` as pretty-printed JSON.
#[instrument(level = "info", skip_all, fields(items = feed.entries.len()))]
pub fn render_feed(feed: &EnrichedFeed) -> Result<String> {
    let json = serde_json::to_string_pretty(feed)?;
    info!(bytes = json.len(), "Rendered JSON feed");
    Ok(json)
}
