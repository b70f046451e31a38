//! URL canonicalization for feed entry links.
//!
//! Aggregators wrap article links in redirectors (`https://agg/r?text=<encoded url>`),
//! some feeds publish nonstandard pseudo-schemes, and a few omit the scheme
//! altogether. [`normalize`] undoes all three and never fails: anything it
//! cannot salvage comes back as-is and is rejected later by
//! [`FetchTarget::parse`].

use crate::models::FetchTarget;
use tracing::debug;
use url::form_urlencoded;

/// Pseudo-schemes rewritten to `https://`.
const PSEUDO_SCHEMES: &[&str] = &["sec://", "feed://", "feeds://"];

/// Query parameter carrying the wrapped canonical URL.
const WRAPPED_URL_PARAM: &str = "text";

/// Upper bound on percent-decoding passes over a wrapped URL.
const MAX_DECODE_PASSES: usize = 3;

/// Canonicalize a raw link.
///
/// Steps, repeated until the output stops changing:
/// 1. trim whitespace
/// 2. rewrite a known pseudo-scheme to `https://`
/// 3. replace the URL with its decoded `text` query parameter when that is a
///    well-formed absolute URL
/// 4. prefix `https://` when no `http`/`https` scheme is present
///
/// # Examples
///
/// ```ignore
/// assert_eq!(normalize("sec://example.com/a"), "https://example.com/a");
/// assert_eq!(
///     normalize("https://agg.example/r?text=https%3A%2F%2Freal.example%2Fa"),
///     "https://real.example/a"
/// );
/// ```
pub fn normalize(raw: &str) -> String {
    let mut current = raw.trim().to_string();
    if current.is_empty() {
        return current;
    }

    // After the first pass every change unwraps a query value, which is
    // strictly shorter than the URL holding it, so this reaches a fixpoint.
    current = normalize_once(&current);
    loop {
        let next = normalize_once(&current);
        if next == current || next.len() >= current.len() {
            return current;
        }
        current = next;
    }
}

/// Normalize and validate in one step.
pub fn to_target(raw: &str) -> Option<FetchTarget> {
    FetchTarget::parse(&normalize(raw))
}

fn normalize_once(input: &str) -> String {
    let mut url = coerce_pseudo_scheme(input.trim());
    if let Some(unwrapped) = unwrap_wrapped_url(&url) {
        debug!(from = %url, to = %unwrapped, "Unwrapped redirector link");
        url = unwrapped;
    }
    ensure_web_scheme(url)
}

fn has_prefix_ignore_case(s: &str, prefix: &str) -> bool {
    s.get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

fn coerce_pseudo_scheme(url: &str) -> String {
    for scheme in PSEUDO_SCHEMES {
        if has_prefix_ignore_case(url, scheme) {
            return format!("https://{}", &url[scheme.len()..]);
        }
    }
    url.to_string()
}

/// Pull a canonical URL out of the `text` query parameter, if there is one.
fn unwrap_wrapped_url(url: &str) -> Option<String> {
    let without_fragment = url.split('#').next().unwrap_or(url);
    let (_, query) = without_fragment.split_once('?')?;

    let value = form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == WRAPPED_URL_PARAM)
        .map(|(_, value)| value.into_owned())?;

    let decoded = decode_bounded(&value);
    let candidate = coerce_pseudo_scheme(decoded.trim());
    FetchTarget::parse(&candidate).map(|_| candidate)
}

/// Percent-decode until a pass changes nothing, at most [`MAX_DECODE_PASSES`] times.
fn decode_bounded(value: &str) -> String {
    let mut current = value.to_string();
    for _ in 0..MAX_DECODE_PASSES {
        let next = match urlencoding::decode(&current) {
            Ok(decoded) => decoded.into_owned(),
            Err(_) => break,
        };
        if next == current {
            break;
        }
        current = next;
    }
    current
}

fn ensure_web_scheme(url: String) -> String {
    if has_prefix_ignore_case(&url, "http://") || has_prefix_ignore_case(&url, "https://") {
        return url;
    }
    // Some other scheme, or free text: leave it for validation to reject.
    if url.contains("://") || url.chars().any(char::is_whitespace) {
        return url;
    }
    let stripped = url.trim_start_matches('/');
    if stripped.is_empty() {
        return url;
    }
    format!("https://{stripped}")
}
