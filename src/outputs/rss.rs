//! RSS 2.0 assembly for enriched feeds, plus the in-band `<error>` document.
//!
//! # Output Structure
//!
//! ```text
//! <rss version="2.0"><channel>
//!   <title/><link/><description/>
//!   <item>
//!     <title/><link/><guid isPermaLink="false"/>
//!     <pubDate/>                      only for a positive timestamp
//!     <description><![CDATA[...]]></description>
//!     <category/>                     inferred MIME type
//!   </item>
//! </channel></rss>
//! ```
//!
//! Text fields are escaped. The description is raw HTML inside CDATA; a `]]>`
//! in the content is split across two CDATA sections so the document stays
//! well-formed.

use crate::content_type;
use crate::error::Result;
use crate::models::{EnrichedEntry, EnrichedFeed};
use crate::utils::xml_safe;
use chrono::DateTime;
use quick_xml::Writer;
use quick_xml::escape::escape;
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};

pub const DEFAULT_TITLE: &str = "Full Text Feed";
pub const CHANNEL_DESCRIPTION: &str = "Full-text version of the source feed";

const XML_DECL: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

type XmlWriter = Writer<Vec<u8>>;

/// Render an enriched feed as an RSS 2.0 document.
pub fn render_feed(feed: &EnrichedFeed) -> Result<String> {
    let mut w = Writer::new(Vec::new());
    w.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    newline(&mut w)?;

    let mut rss = BytesStart::new("rss");
    rss.push_attribute(("version", "2.0"));
    w.write_event(Event::Start(rss))?;
    w.write_event(Event::Start(BytesStart::new("channel")))?;
    newline(&mut w)?;

    text_element(&mut w, "title", feed.title.as_deref().unwrap_or(DEFAULT_TITLE))?;
    text_element(&mut w, "link", &feed.link)?;
    text_element(&mut w, "description", CHANNEL_DESCRIPTION)?;
    newline(&mut w)?;

    for entry in &feed.entries {
        write_item(&mut w, entry)?;
    }

    w.write_event(Event::End(BytesEnd::new("channel")))?;
    w.write_event(Event::End(BytesEnd::new("rss")))?;
    newline(&mut w)?;

    Ok(String::from_utf8_lossy(&w.into_inner()).into_owned())
}

/// Minimal error document. The message is escaped and never carries diagnostics.
pub fn render_error(message: &str) -> String {
    format!("{XML_DECL}\n<error>{}</error>\n", escape(xml_safe(message).as_str()))
}

/// RFC-822 date in GMT for a positive epoch timestamp.
pub fn rfc822(timestamp: i64) -> Option<String> {
    if timestamp <= 0 {
        return None;
    }
    DateTime::from_timestamp(timestamp, 0)
        .map(|dt| dt.format("%a, %d %b %Y %H:%M:%S GMT").to_string())
}

/// Split content so that no section contains the `]]>` terminator.
fn cdata_sections(content: &str) -> Vec<String> {
    let parts: Vec<&str> = content.split("]]>").collect();
    let last = parts.len() - 1;
    parts
        .iter()
        .enumerate()
        .map(|(i, part)| {
            let mut section = String::new();
            if i > 0 {
                section.push('>');
            }
            section.push_str(part);
            if i < last {
                section.push_str("]]");
            }
            section
        })
        .collect()
}

fn newline(w: &mut XmlWriter) -> Result<()> {
    w.write_event(Event::Text(BytesText::from_escaped("\n")))?;
    Ok(())
}

fn text_element(w: &mut XmlWriter, name: &str, text: &str) -> Result<()> {
    w.write_event(Event::Start(BytesStart::new(name)))?;
    w.write_event(Event::Text(BytesText::new(&xml_safe(text))))?;
    w.write_event(Event::End(BytesEnd::new(name)))?;
    newline(w)
}

fn write_item(w: &mut XmlWriter, enriched: &EnrichedEntry) -> Result<()> {
    let entry = &enriched.entry;
    w.write_event(Event::Start(BytesStart::new("item")))?;
    newline(w)?;

    text_element(w, "title", &entry.title)?;
    text_element(w, "link", &entry.link)?;

    let guid = entry
        .id
        .as_deref()
        .filter(|id| !id.is_empty())
        .unwrap_or(&entry.link);
    let mut guid_start = BytesStart::new("guid");
    guid_start.push_attribute(("isPermaLink", "false"));
    w.write_event(Event::Start(guid_start))?;
    w.write_event(Event::Text(BytesText::new(&xml_safe(guid))))?;
    w.write_event(Event::End(BytesEnd::new("guid")))?;
    newline(w)?;

    if let Some(date) = entry.published.and_then(rfc822) {
        text_element(w, "pubDate", &date)?;
    }

    w.write_event(Event::Start(BytesStart::new("description")))?;
    for section in cdata_sections(&xml_safe(&enriched.content_html)) {
        w.write_event(Event::CData(BytesCData::new(section)))?;
    }
    w.write_event(Event::End(BytesEnd::new("description")))?;
    newline(w)?;

    let mime = if enriched.mime_type.is_empty() {
        content_type::HTML
    } else {
        enriched.mime_type.as_str()
    };
    text_element(w, "category", mime)?;

    w.write_event(Event::End(BytesEnd::new("item")))?;
    newline(w)
}
