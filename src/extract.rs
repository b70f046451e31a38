//! Main-content extraction from arbitrary article HTML.
//!
//! Extraction runs in two tiers. A structural pass over the DOM built by
//! `scraper` is tried first. When the HTML parser rejects the document, a
//! regex scan over the raw markup takes over. Neither tier ever produces an
//! error: the last resort is the trimmed input itself.
//!
//! # Structural precedence
//!
//! | Step | Candidate | Returns |
//! |------|-----------|---------|
//! | 1 | first `<article>` | its inner HTML |
//! | 2 | first `<main>` | its inner HTML |
//! | 3 | `<div>`/`<section>` with the longest plain text | its inner HTML |
//! | 4 | `<body>` | its inner HTML |
//! | 5 | nothing | trimmed input |
//!
//! Step 3 is a plain length comparison with no scoring of navigation or ad
//! blocks; the first element in document order wins a tie.

use crate::error::{AppError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, instrument};

static ARTICLE: Lazy<Selector> = Lazy::new(|| Selector::parse("article").expect("static selector"));
static MAIN: Lazy<Selector> = Lazy::new(|| Selector::parse("main").expect("static selector"));
static BLOCKS: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div, section").expect("static selector"));
static BODY: Lazy<Selector> = Lazy::new(|| Selector::parse("body").expect("static selector"));

static ARTICLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<article\b[^>]*>(.*?)</article>").expect("static regex"));
static MAIN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<main\b[^>]*>(.*?)</main>").expect("static regex"));
static BODY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<body\b[^>]*>(.*?)</body>").expect("static regex"));

/// Picks the primary content region out of a page.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentExtractor {
    /// Parse-error budget. `None` accepts whatever the HTML5 parser recovers.
    max_parse_errors: Option<usize>,
}

impl ContentExtractor {
    pub fn new(max_parse_errors: Option<usize>) -> Self {
        Self { max_parse_errors }
    }

    /// Return the best-guess main-content fragment of `html`.
    ///
    /// Only empty input yields an empty string from the fallback path;
    /// structural matches may still have empty inner content.
    #[instrument(level = "debug", skip_all, fields(bytes = html.len()))]
    pub fn extract(&self, html: &str) -> String {
        let trimmed = html.trim();
        if trimmed.is_empty() {
            return String::new();
        }

        match self.parse_document(html) {
            Ok(document) => {
                extract_from_document(&document).unwrap_or_else(|| trimmed.to_string())
            }
            Err(e) => {
                debug!(error = %e, "Structured parse rejected; using regex fallback");
                extract_with_regex(html)
            }
        }
    }

    /// Parse `html` into a DOM, rejecting documents over the error budget.
    pub fn parse_document(&self, html: &str) -> Result<Html> {
        let document = Html::parse_document(html);
        if let Some(max) = self.max_parse_errors {
            if document.errors.len() > max {
                return Err(AppError::Extraction(format!(
                    "{} parse errors exceed budget of {}",
                    document.errors.len(),
                    max
                )));
            }
        }
        Ok(document)
    }
}

fn inner(element: ElementRef<'_>) -> String {
    element.inner_html().trim().to_string()
}

fn text_len(element: ElementRef<'_>) -> usize {
    element.text().collect::<String>().trim().chars().count()
}

/// Steps 1 to 4 of the structural strategy. `None` means step 5 applies.
fn extract_from_document(document: &Html) -> Option<String> {
    if let Some(article) = document.select(&ARTICLE).next() {
        debug!("Matched <article>");
        return Some(inner(article));
    }
    if let Some(main) = document.select(&MAIN).next() {
        debug!("Matched <main>");
        return Some(inner(main));
    }

    let mut best: Option<(ElementRef<'_>, usize)> = None;
    for block in document.select(&BLOCKS) {
        let len = text_len(block);
        if len > best.map_or(0, |(_, best_len)| best_len) {
            best = Some((block, len));
        }
    }
    if let Some((block, len)) = best {
        debug!(text_len = len, tag = block.value().name(), "Matched largest block");
        return Some(inner(block));
    }

    document.select(&BODY).next().map(|body| {
        debug!("Matched <body>");
        inner(body)
    })
}

/// Regex scan for `<article>`, `<main>`, then `<body>`; trimmed input otherwise.
pub fn extract_with_regex(html: &str) -> String {
    for re in [&*ARTICLE_RE, &*MAIN_RE, &*BODY_RE] {
        if let Some(captured) = re.captures(html).and_then(|c| c.get(1)) {
            return captured.as_str().trim().to_string();
        }
    }
    html.trim().to_string()
}
