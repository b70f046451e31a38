//! MIME type inference for feed entries.

use crate::models::FeedEntry;

pub const HTML: &str = "text/html";
pub const XML: &str = "application/xml";

/// Determine the lower-cased MIME type of an entry.
///
/// Precedence: enclosure type, then the entry's declared content type, then
/// `text/html` if the entry carries any content or description, otherwise
/// `application/xml`.
pub fn infer(entry: &FeedEntry) -> String {
    let declared = [&entry.enclosure_type, &entry.content_type]
        .into_iter()
        .flatten()
        .map(|t| t.trim())
        .find(|t| !t.is_empty());
    if let Some(mime) = declared {
        return mime.to_lowercase();
    }

    let has_content = entry.content.as_deref().is_some_and(|c| !c.is_empty());
    if has_content || !entry.description.is_empty() {
        HTML.to_string()
    } else {
        XML.to_string()
    }
}
