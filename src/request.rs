//! Request parameter resolution.
//!
//! Parameters arrive in the query string, a form body, or both. Query values
//! take precedence. Integers are read leniently: leading digits count and
//! anything unparseable behaves like `0`, which then falls back to defaults.

use crate::config::Settings;
use crate::error::{AppError, Result};
use crate::models::FetchTarget;
use crate::normalize;
use std::collections::HashMap;
use std::time::Duration;
use url::form_urlencoded;

/// A validated full-text request.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedRequest {
    pub url: FetchTarget,
    pub limit: usize,
    pub timeout: Duration,
}

/// Merge query-string and form-body parameters; the query string wins.
pub fn merge_params(query: Option<&str>, body: &[u8]) -> HashMap<String, String> {
    let mut params: HashMap<String, String> = query
        .map(|q| form_urlencoded::parse(q.as_bytes()).into_owned().collect())
        .unwrap_or_default();
    for (key, value) in form_urlencoded::parse(body).into_owned() {
        params.entry(key).or_insert(value);
    }
    params
}

/// Read an integer the forgiving way: optional sign, then leading digits.
fn lenient_int(raw: &str) -> i64 {
    let s = raw.trim();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return 0;
    }
    let value = digits[..end].parse::<i64>().unwrap_or(i64::MAX);
    if negative { -value } else { value }
}

impl FeedRequest {
    /// Resolve `url`, `limit` (alias `max`) and `timeout` from raw parameters.
    ///
    /// # Errors
    ///
    /// [`AppError::Input`] when `url` is missing or does not normalize to an
    /// absolute `http(s)` URL.
    pub fn from_params(params: &HashMap<String, String>, settings: &Settings) -> Result<Self> {
        let raw_url = params.get("url").map(|s| s.trim()).unwrap_or_default();
        if raw_url.is_empty() {
            return Err(AppError::Input("missing 'url' parameter".to_string()));
        }
        let url = normalize::to_target(raw_url)
            .ok_or_else(|| AppError::Input(format!("not an absolute http(s) URL: {raw_url}")))?;

        let limit = params
            .get("limit")
            .or_else(|| params.get("max"))
            .map(|v| lenient_int(v))
            .filter(|n| *n > 0)
            .map(|n| usize::try_from(n).unwrap_or(usize::MAX))
            .unwrap_or(settings.default_limit);

        let requested = params
            .get("timeout")
            .map(|v| lenient_int(v))
            .unwrap_or(settings.default_timeout_secs as i64);
        let timeout_secs = if requested < settings.min_timeout_secs as i64 {
            settings.fallback_timeout_secs
        } else {
            requested as u64
        };

        Ok(Self {
            url,
            limit,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn resolve(pairs: &[(&str, &str)]) -> Result<FeedRequest> {
        FeedRequest::from_params(&params(pairs), &Settings::default())
    }

    #[test]
    fn test_defaults() {
        let req = resolve(&[("url", "https://news.example/rss")]).unwrap();
        assert_eq!(req.url.as_str(), "https://news.example/rss");
        assert_eq!(req.limit, 50);
        assert_eq!(req.timeout, Duration::from_secs(15));
    }

    #[test]
    fn test_missing_or_invalid_url() {
        assert!(matches!(resolve(&[]), Err(AppError::Input(_))));
        assert!(matches!(resolve(&[("url", "  ")]), Err(AppError::Input(_))));
        assert!(matches!(resolve(&[("url", "not a url")]), Err(AppError::Input(_))));
        assert!(matches!(resolve(&[("url", "ftp://x.example/")]), Err(AppError::Input(_))));
    }

    #[test]
    fn test_feed_url_is_normalized() {
        let req = resolve(&[("url", "feed://news.example/rss")]).unwrap();
        assert_eq!(req.url.as_str(), "https://news.example/rss");
    }

    #[test]
    fn test_limit_and_legacy_alias() {
        let url = ("url", "https://n.example/");
        assert_eq!(resolve(&[url, ("limit", "5")]).unwrap().limit, 5);
        assert_eq!(resolve(&[url, ("max", "7")]).unwrap().limit, 7);
        assert_eq!(resolve(&[url, ("limit", "3"), ("max", "7")]).unwrap().limit, 3);
        assert_eq!(resolve(&[url, ("limit", "0")]).unwrap().limit, 50);
        assert_eq!(resolve(&[url, ("limit", "-4")]).unwrap().limit, 50);
        assert_eq!(resolve(&[url, ("limit", "abc")]).unwrap().limit, 50);
        assert_eq!(resolve(&[url, ("limit", "12items")]).unwrap().limit, 12);
    }

    #[test]
    fn test_timeout_floor_coercion() {
        let url = ("url", "https://n.example/");
        assert_eq!(resolve(&[url, ("timeout", "30")]).unwrap().timeout, Duration::from_secs(30));
        assert_eq!(resolve(&[url, ("timeout", "3")]).unwrap().timeout, Duration::from_secs(3));
        assert_eq!(resolve(&[url, ("timeout", "2")]).unwrap().timeout, Duration::from_secs(10));
        assert_eq!(resolve(&[url, ("timeout", "junk")]).unwrap().timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_query_takes_precedence_over_body() {
        let merged = merge_params(
            Some("url=https%3A%2F%2Fq.example%2Frss&limit=2"),
            b"url=https%3A%2F%2Fbody.example%2Frss&timeout=20",
        );
        assert_eq!(merged["url"], "https://q.example/rss");
        assert_eq!(merged["limit"], "2");
        assert_eq!(merged["timeout"], "20");
    }

    #[test]
    fn test_lenient_int() {
        assert_eq!(lenient_int(" 42 "), 42);
        assert_eq!(lenient_int("-3"), -3);
        assert_eq!(lenient_int("+8x"), 8);
        assert_eq!(lenient_int(""), 0);
        assert_eq!(lenient_int("x1"), 0);
        assert_eq!(lenient_int("99999999999999999999999"), i64::MAX);
    }
}
